mod common;
use crate::common::init_tracing;

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use assetpipe::dag::{DagGraph, Scheduler, TaskRunState};
use assetpipe::engine::TaskOutcome;
use assetpipe::errors::PipelineError;

fn names(tasks: &[assetpipe::dag::ScheduledTask]) -> Vec<String> {
    tasks.iter().map(|t| t.name.clone()).collect()
}

#[test]
fn standard_graph_closures() {
    init_tracing();
    let graph = DagGraph::standard();

    let styles: Vec<String> = graph.closure_of("styles").into_iter().collect();
    assert_eq!(styles, vec!["images", "styles"]);

    let watch: Vec<String> = graph.closure_of("watch").into_iter().collect();
    assert_eq!(watch, vec!["bundle-script", "watch"]);

    let build: BTreeSet<String> = graph.closure_of("build");
    assert_eq!(build.len(), 5);
    assert!(!build.contains("watch"));
}

#[test]
fn execution_plan_respects_dependencies() {
    let graph = DagGraph::standard();
    let plan = graph.execution_plan("build").unwrap();

    let pos = |name: &str| plan.iter().position(|t| t == name).unwrap();
    assert_eq!(plan.last().map(String::as_str), Some("build"));
    assert!(pos("images") < pos("styles"));
    assert_eq!(plan.len(), 5);
}

#[test]
fn execution_plan_for_unknown_target_fails() {
    let graph = DagGraph::standard();
    let err = graph.execution_plan("deploy").unwrap_err();
    assert!(matches!(err, PipelineError::TaskNotFound(name) if name == "deploy"));
}

#[test]
fn build_runs_dependencies_before_aggregate() {
    init_tracing();
    let mut scheduler = Scheduler::standard();

    let first = scheduler.handle_trigger("build");
    assert_eq!(names(&first), vec!["bundle-script", "images", "markup"]);
    assert_eq!(scheduler.run_state_of("styles"), Some(TaskRunState::Pending));
    assert_eq!(scheduler.run_state_of("watch"), Some(TaskRunState::NotInRun));

    assert!(scheduler.handle_completion("bundle-script", TaskOutcome::Success).is_empty());
    assert_eq!(
        names(&scheduler.handle_completion("images", TaskOutcome::Success)),
        vec!["styles"]
    );
    assert!(scheduler.handle_completion("markup", TaskOutcome::Success).is_empty());
    assert_eq!(
        names(&scheduler.handle_completion("styles", TaskOutcome::Success)),
        vec!["build"]
    );
    assert!(scheduler.handle_completion("build", TaskOutcome::Success).is_empty());
    assert!(scheduler.is_idle());
}

#[test]
fn styles_trigger_pulls_in_images_only() {
    let mut scheduler = Scheduler::standard();

    let first = scheduler.handle_trigger("styles");
    assert_eq!(names(&first), vec!["images"]);

    let mut in_run = scheduler.tasks_in_current_run();
    in_run.sort();
    assert_eq!(in_run, vec!["images", "styles"]);
}

#[test]
fn failure_fails_dependents() {
    let mut scheduler = Scheduler::standard();
    scheduler.handle_trigger("build");

    let step = scheduler.step_completion("images", TaskOutcome::Failed("boom".into()));
    let failed: HashSet<String> = step.newly_failed.into_iter().collect();
    assert_eq!(
        failed,
        HashSet::from(["images".to_string(), "styles".to_string(), "build".to_string()])
    );
    assert!(step.newly_scheduled.is_empty());

    scheduler.handle_completion("bundle-script", TaskOutcome::Success);
    let last = scheduler.step_completion("markup", TaskOutcome::Success);
    assert!(last.run_just_finished);
    assert!(scheduler.is_idle());
}

#[test]
fn dependency_succeeding_in_previous_run_is_rerun() {
    let mut scheduler = Scheduler::standard();
    scheduler.handle_trigger("styles");
    scheduler.handle_completion("images", TaskOutcome::Success);
    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());

    // A new run must not reuse the old images result.
    let again = scheduler.handle_trigger("styles");
    assert_eq!(names(&again), vec!["images"]);
}

// Acyclic graphs: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..n), n).prop_map(
            move |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps: BTreeSet<String> = if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| format!("t{}", p % i)).collect()
                        };
                        (format!("t{i}"), deps.into_iter().collect())
                    })
                    .collect()
            },
        )
    })
}

proptest! {
    #[test]
    fn every_task_runs_after_its_dependencies(specs in dag_strategy(8), target_idx in any::<usize>()) {
        let graph = DagGraph::from_specs(specs.clone()).unwrap();
        let target = format!("t{}", target_idx % specs.len());
        let closure = graph.closure_of(&target);

        let mut scheduler = Scheduler::new(graph.clone());
        let mut ready: Vec<String> = names(&scheduler.handle_trigger(&target));
        let mut done: Vec<String> = Vec::new();

        while let Some(task) = ready.pop() {
            for dep in graph.dependencies_of(&task) {
                prop_assert!(done.contains(dep), "{} ran before its dependency {}", task, dep);
            }
            done.push(task.clone());
            ready.extend(names(&scheduler.handle_completion(&task, TaskOutcome::Success)));
        }

        let ran: BTreeSet<String> = done.into_iter().collect();
        prop_assert_eq!(ran, closure);
        prop_assert!(scheduler.is_idle());
    }
}
