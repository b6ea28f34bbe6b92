mod common;
use crate::common::init_tracing;

use std::path::PathBuf;
use std::time::Duration;

use assetpipe::bundle::logger::{pretty_duration, BundleLogger};
use assetpipe::config::NotifySettings;
use assetpipe::errors::CompileError;
use assetpipe::notifier::{
    notifier_from_settings, report_all, report_compile_error, Notification, Notifier,
    COMPILE_ERROR_TITLE,
};
use assetpipe_test_utils::fakes::RecordingNotifier;

#[test]
fn durations_use_the_largest_fitting_unit() {
    assert_eq!(pretty_duration(Duration::from_secs(65)), "1 m 5 s");
    assert_eq!(pretty_duration(Duration::from_millis(1250)), "1.25 s");
    assert_eq!(pretty_duration(Duration::from_secs(2)), "2 s");
    assert_eq!(pretty_duration(Duration::from_millis(340)), "340 ms");
    assert_eq!(pretty_duration(Duration::from_micros(12)), "12 μs");
    assert_eq!(pretty_duration(Duration::from_nanos(800)), "800 ns");
}

#[test]
fn timer_reports_elapsed_time() {
    init_tracing();
    let timer = BundleLogger::new().begin("bundle.js");
    std::thread::sleep(Duration::from_millis(5));
    let elapsed = timer.end(1024);
    assert!(elapsed >= Duration::from_millis(5));

    let failed = BundleLogger::new().begin("bundle.js").fail();
    assert!(failed < Duration::from_secs(1));
}

#[test]
fn compile_error_notifications_name_the_file() {
    let err = CompileError::Script {
        path: PathBuf::from("js/app.js"),
        message: "Cannot find module './x'".to_string(),
    };
    let note = Notification::compile_error(&err);
    assert_eq!(note.title, COMPILE_ERROR_TITLE);
    assert_eq!(note.message, "js/app.js: Cannot find module './x'");
}

#[test]
fn each_error_is_notified_exactly_once() {
    init_tracing();
    let notifier = RecordingNotifier::new();
    let errors = vec![
        CompileError::Stylesheet {
            path: PathBuf::from("scss/a.scss"),
            message: "expected \"}\".".to_string(),
        },
        CompileError::Image {
            path: PathBuf::from("images/b.png"),
            message: "invalid PNG signature".to_string(),
        },
    ];

    report_all(&notifier, &[]);
    assert_eq!(notifier.count(), 0);

    report_all(&notifier, &errors);
    let sent = notifier.notifications();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|n| n.title == COMPILE_ERROR_TITLE));
    assert!(sent[0].message.starts_with("scss/a.scss: "));
    assert!(sent[1].message.starts_with("images/b.png: "));

    report_compile_error(&notifier, &errors[0]);
    assert_eq!(notifier.count(), 3);
}

#[test]
fn disabled_notifications_fall_back_to_the_log() {
    init_tracing();
    let notifier = notifier_from_settings(&NotifySettings { enabled: false });
    assert!(format!("{notifier:?}").contains("LogNotifier"));

    // Outside a runtime the desktop notifier only logs.
    let desktop = notifier_from_settings(&NotifySettings { enabled: true });
    desktop.notify(&Notification::new("t", "m"));
}

#[test]
fn log_filter_comes_from_the_environment_value() {
    use assetpipe::logging::filter_from_env;

    assert_eq!(filter_from_env(None).unwrap().to_string(), "info");
    assert_eq!(filter_from_env(Some("  ")).unwrap().to_string(), "info");
    assert!(filter_from_env(Some("warn,assetpipe::bundle=debug")).is_ok());
    assert!(filter_from_env(Some("assetpipe=loud")).is_err());
}
