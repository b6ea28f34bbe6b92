// tests/runtime_fake_executor.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use assetpipe::dag::Scheduler;
use assetpipe::engine::{
    CoreCommand, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetpipe::errors::PipelineError;
use assetpipe_test_utils::fake_executor::FakeExecutor;

type TestResult = Result<(), Box<dyn Error>>;

fn one_shot() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
        required_task: None,
    }
}

fn resident(target: &str) -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: false,
        required_task: Some(target.to_string()),
    }
}

fn core(options: RuntimeOptions) -> CoreRuntime {
    CoreRuntime::new(
        Scheduler::standard(),
        TriggerWhileRunningBehaviour::Queue,
        1,
        options,
    )
}

fn manual(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::Manual,
    }
}

#[tokio::test]
async fn build_runs_whole_closure_and_exits() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    tx.send(manual("build")).await?;

    let runtime = Runtime::new(core(one_shot()), rx, executor);
    timeout(Duration::from_secs(5), runtime.run()).await??;

    let executed = executed.lock().unwrap().clone();
    assert_eq!(
        executed,
        vec!["bundle-script", "images", "markup", "styles", "build"]
    );
    Ok(())
}

#[tokio::test]
async fn single_task_target_runs_only_its_closure() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    tx.send(manual("styles")).await?;

    let runtime = Runtime::new(core(one_shot()), rx, executor);
    timeout(Duration::from_secs(5), runtime.run()).await??;

    assert_eq!(executed.lock().unwrap().clone(), vec!["images", "styles"]);
    Ok(())
}

#[tokio::test]
async fn failed_dependency_makes_one_shot_run_fail() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed)).failing("images");

    tx.send(manual("build")).await?;

    let runtime = Runtime::new(core(one_shot()), rx, executor);
    let result = timeout(Duration::from_secs(5), runtime.run()).await?;

    match result {
        Err(PipelineError::TasksFailed(failed)) => {
            assert!(failed.contains(&"images".to_string()));
            assert!(failed.contains(&"styles".to_string()));
            assert!(failed.contains(&"build".to_string()));
        }
        other => panic!("expected TasksFailed, got {other:?}"),
    }

    // styles and build never ran.
    let executed = executed.lock().unwrap().clone();
    assert!(!executed.contains(&"styles".to_string()));
    assert!(!executed.contains(&"build".to_string()));
    Ok(())
}

#[tokio::test]
async fn watch_stays_resident_until_shutdown() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));

    tx.send(manual("watch")).await?;

    let runtime = Runtime::new(core(resident("watch")), rx, executor);
    let handle = tokio::spawn(runtime.run());

    // The initial run finishes, but the runtime keeps going.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());
    assert_eq!(executed.lock().unwrap().clone(), vec!["bundle-script", "watch"]);

    // A file-watch trigger starts a fresh run.
    tx.send(RuntimeEvent::TaskTriggered {
        task: "styles".to_string(),
        reason: TriggerReason::FileWatch,
    })
    .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        executed.lock().unwrap().clone(),
        vec!["bundle-script", "watch", "images", "styles"]
    );

    tx.send(RuntimeEvent::ShutdownRequested).await?;
    timeout(Duration::from_secs(5), handle).await???;
    Ok(())
}

#[tokio::test]
async fn watch_exits_when_initial_bundle_fails() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed)).failing("bundle-script");

    tx.send(manual("watch")).await?;

    let runtime = Runtime::new(core(resident("watch")), rx, executor);
    let result = timeout(Duration::from_secs(5), runtime.run()).await?;
    assert!(matches!(result, Err(PipelineError::TasksFailed(_))));
    Ok(())
}

#[test]
fn trigger_for_running_task_is_queued_for_next_run() {
    init_tracing();
    let mut core = core(one_shot());

    let step = core.step(manual("styles"));
    assert_eq!(step.commands.len(), 1);

    // `images` is already in the run: queue instead of dispatching.
    let step = core.step(RuntimeEvent::TaskTriggered {
        task: "images".to_string(),
        reason: TriggerReason::FileWatch,
    });
    assert!(step.commands.is_empty());
    assert!(!core.queue_is_empty());

    core.step(RuntimeEvent::TaskCompleted {
        task: "images".to_string(),
        outcome: TaskOutcome::Success,
    });
    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "styles".to_string(),
        outcome: TaskOutcome::Success,
    });

    // The run finished, so the queued trigger starts the next one.
    assert!(step.keep_running);
    let dispatched: Vec<String> = step
        .commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(dispatched, vec!["images"]);
    assert!(core.queue_is_empty());
}

#[test]
fn trigger_outside_run_is_merged() {
    let mut core = core(resident("watch"));

    core.step(manual("watch"));
    let step = core.step(RuntimeEvent::TaskTriggered {
        task: "markup".to_string(),
        reason: TriggerReason::FileWatch,
    });

    assert_eq!(
        step.commands,
        vec![CoreCommand::DispatchTasks(vec![assetpipe::dag::ScheduledTask {
            name: "markup".to_string(),
            run_id: 1,
        }])]
    );
}
