// tests/build_end_to_end.rs

mod common;
use crate::common::{eventually, init_tracing, mock_fs, sample_png};

use std::sync::Arc;

use tokio::sync::mpsc;

use assetpipe::bundle::{BundleFailure, BundleOutput, BundleRequest, ScriptBundler};
use assetpipe::config::ConfigFile;
use assetpipe::dag::Scheduler;
use assetpipe::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use assetpipe::errors::CompileError;
use assetpipe::exec::task_runner::bundle_script;
use assetpipe::exec::{RealExecutorBackend, TaskEnvironment};
use assetpipe::fs::{FileSystem, MockFileSystem};
use assetpipe_test_utils::builders::{bundle, ConfigFileBuilder};
use assetpipe_test_utils::fakes::{ManualDependencyWatchFactory, RecordingNotifier};
use assetpipe_test_utils::with_timeout;

/// Bundler that rejects every entry with a syntax error.
#[derive(Debug)]
struct RejectingBundler;

impl ScriptBundler for RejectingBundler {
    fn bundle(
        &self,
        _fs: &dyn FileSystem,
        request: &BundleRequest<'_>,
    ) -> Result<BundleOutput, BundleFailure> {
        Err(BundleFailure {
            error: CompileError::Script {
                path: request.entry.to_path_buf(),
                message: "Unexpected token".to_string(),
            },
            dependencies: [request.entry.to_path_buf()].into_iter().collect(),
        })
    }
}

fn project() -> MockFileSystem {
    mock_fs(&[
        ("scss/_base.scss", "$fg: #333;\n"),
        ("scss/site.scss", "@import 'base';\nbody { color: $fg; }\n"),
        ("images/logo.svg", "<svg/>"),
        ("docs/index.html", "<h1>Docs</h1>"),
        ("js/app.js", "var lib = require('./lib');\nlib();\n"),
        ("js/lib.js", "module.exports = function () {};\n"),
    ])
}

fn config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_styles(&["scss/*.scss"], "build")
        .with_images(&["images/**"], "build/images")
        .with_markup(&["docs/**"], "build")
        .with_bundle(bundle("js/app.js", "bundle.js"))
        .build()
}

async fn run_build(env: TaskEnvironment, rx: mpsc::Receiver<RuntimeEvent>) -> assetpipe::errors::Result<()> {
    let env = Arc::new(env);
    let backend = RealExecutorBackend::new(Arc::clone(&env));
    env.runtime_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "build".to_string(),
            reason: TriggerReason::Manual,
        })
        .await
        .unwrap();

    let core = CoreRuntime::new(
        Scheduler::standard(),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
            required_task: None,
        },
    );
    with_timeout(Runtime::new(core, rx, backend).run()).await
}

#[tokio::test]
async fn build_writes_every_output() {
    init_tracing();
    let fs = project();
    let notifier = RecordingNotifier::new();
    let (tx, rx) = mpsc::channel(64);
    let env = TaskEnvironment::new(config(), ".", tx, false)
        .with_fs(Arc::new(fs.clone()))
        .with_notifier(Arc::new(notifier.clone()));

    run_build(env, rx).await.unwrap();

    let css = String::from_utf8(fs.contents("build/site.css").unwrap()).unwrap();
    assert!(css.contains("color: #333"));
    assert!(fs.contents("build/_base.css").is_none());
    assert_eq!(fs.contents("build/images/logo.svg").unwrap(), b"<svg/>".to_vec());
    assert!(fs.contents("build/index.html").is_some());

    let js = String::from_utf8(fs.contents("build/bundle.js").unwrap()).unwrap();
    assert!(js.contains("module.exports = function () {};"));
    assert!(fs.contents("build/bundle.js.map").is_some());
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn repeated_build_is_byte_identical() {
    init_tracing();
    let fs = project();
    fs.add_file("images/photo.png", sample_png(32, 32));

    let outputs = [
        "build/site.css",
        "build/images/logo.svg",
        "build/images/photo.png",
        "build/index.html",
        "build/bundle.js",
        "build/bundle.js.map",
    ];
    let snapshot = |fs: &MockFileSystem| -> Vec<Option<Vec<u8>>> {
        outputs.iter().map(|p| fs.contents(p)).collect()
    };

    let mut runs = Vec::new();
    for _ in 0..2 {
        let (tx, rx) = mpsc::channel(64);
        let env = TaskEnvironment::new(config(), ".", tx, false)
            .with_fs(Arc::new(fs.clone()))
            .with_notifier(Arc::new(RecordingNotifier::new()));
        run_build(env, rx).await.unwrap();
        runs.push(snapshot(&fs));
    }

    for (path, bytes) in outputs.iter().zip(&runs[0]) {
        assert!(bytes.is_some(), "{path} missing after first build");
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn script_compile_errors_notify_without_failing_the_build() {
    init_tracing();
    let fs = project();
    let notifier = RecordingNotifier::new();
    let (tx, rx) = mpsc::channel(64);
    let env = TaskEnvironment::new(config(), ".", tx, false)
        .with_fs(Arc::new(fs.clone()))
        .with_notifier(Arc::new(notifier.clone()))
        .with_bundler(Arc::new(RejectingBundler));

    run_build(env, rx).await.unwrap();

    assert!(fs.contents("build/bundle.js").is_none());
    assert!(fs.contents("build/site.css").is_some());
    let sent = notifier.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "js/app.js: Unexpected token");
}

#[tokio::test]
async fn watch_mode_keeps_bundle_contexts_resident() {
    init_tracing();
    let fs = project();
    let factory = ManualDependencyWatchFactory::new();
    let (tx, _rx) = mpsc::channel(64);
    let env = Arc::new(
        TaskEnvironment::new(config(), ".", tx, true)
            .with_fs(Arc::new(fs.clone()))
            .with_notifier(Arc::new(RecordingNotifier::new()))
            .with_dependency_watch(Arc::new(factory.clone())),
    );

    with_timeout(bundle_script(Arc::clone(&env))).await.unwrap();
    assert_eq!(env.resident_count(), 1);

    assert!(eventually(|| factory.last_update_for("bundle.js").is_some()).await);
    let deps = factory.last_update_for("bundle.js").unwrap();
    assert_eq!(deps.len(), 2);

    fs.add_file("js/lib.js", "module.exports = function () { return 2; };\n");
    assert!(factory.trigger("bundle.js", vec!["js/lib.js".into()]));
    assert!(
        eventually(|| {
            fs.contents("build/bundle.js")
                .is_some_and(|js| String::from_utf8_lossy(&js).contains("return 2;"))
        })
        .await
    );
}
