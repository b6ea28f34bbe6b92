mod common;
use crate::common::{init_tracing, write_tree};

use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use tempfile::tempdir;

use assetpipe::config::{load_and_validate, resolve_config, ConfigFile};
use assetpipe::errors::PipelineError;
use assetpipe::types::{StyleOutput, TaskKind, TriggerWhileRunningBehaviour};
use assetpipe_test_utils::builders::{bundle, ConfigFileBuilder};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn empty_file_gives_default_layout() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_tree(dir.path(), &[("Assetpipe.toml", "")]);

    let cfg = load_and_validate(dir.path().join("Assetpipe.toml"))?;

    assert_eq!(cfg.styles().src, vec!["scss/*.{sass,scss}"]);
    assert_eq!(cfg.styles().dest, PathBuf::from("build"));
    assert_eq!(cfg.images().dest, PathBuf::from("build/images"));
    assert_eq!(cfg.markup().src, vec!["docs/**"]);
    assert_eq!(cfg.bundle_configs().len(), 1);
    assert_eq!(cfg.bundle_configs()[0].output_path(), PathBuf::from("build/bundle.js"));

    let options = cfg.build_options();
    assert!(options.source_maps);
    assert_eq!(options.extensions, vec![".coffee"]);

    assert_eq!(cfg.watch().queue_length, 1);
    assert!(!cfg.watch().use_hash);
    assert!(cfg.notify().enabled);
    assert!(!cfg.livereload().enabled);
    Ok(())
}

#[test]
fn full_file_is_parsed() -> TestResult {
    let dir = tempdir()?;
    write_tree(
        dir.path(),
        &[(
            "site/Assetpipe.toml",
            r#"
[styles]
src = ["sass/**/*.scss"]
dest = "public/css"
output_style = "compressed"

[bundle]
source_maps = false
extensions = [".coffee", ".mjs"]

[[bundle.configs]]
entry = "js/app.js"
output_name = "app.js"

[[bundle.configs]]
entry = "js/admin.js"
dest = "public"
output_name = "admin.js"

[watch]
triggered_while_running = "cancel"
queue_length = 2
use_hash = true
debounce_ms = 50

[notify]
enabled = false

[livereload]
enabled = true
port = 0
"#,
        )],
    );

    let path = dir.path().join("site/Assetpipe.toml");
    let (cfg, root) = resolve_config(Some(path.to_str().unwrap()))?;

    assert_eq!(root, dir.path().join("site"));
    assert_eq!(cfg.styles().output_style, StyleOutput::Compressed);
    assert_eq!(cfg.bundle_configs()[0].dest, PathBuf::from("build"));
    assert_eq!(cfg.bundle_configs()[1].output_path(), PathBuf::from("public/admin.js"));
    assert!(!cfg.build_options().source_maps);
    assert_eq!(cfg.watch().triggered_while_running, TriggerWhileRunningBehaviour::Cancel);
    assert_eq!(cfg.watch().debounce_ms, 50);
    assert!(!cfg.notify().enabled);
    assert_eq!(cfg.livereload().port, 0);
    assert_eq!(cfg.livereload().host, "127.0.0.1");
    Ok(())
}

#[test]
fn duplicate_bundle_outputs_are_rejected() {
    let err = ConfigFileBuilder::new()
        .with_bundle(bundle("js/a.js", "bundle.js"))
        .with_bundle(assetpipe::config::BundleConfig::new("js/b.js", "./build", "bundle.js"))
        .try_build()
        .unwrap_err();

    match err {
        PipelineError::ConfigError(msg) => assert!(msg.contains("build/bundle.js"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn output_name_must_be_a_file_name() {
    let err = ConfigFileBuilder::new()
        .with_bundle(bundle("js/a.js", "nested/bundle.js"))
        .try_build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));
}

#[test]
fn invalid_values_are_rejected() {
    let bad_glob = ConfigFileBuilder::new()
        .with_styles(&["scss/[.scss"], "build")
        .try_build();
    assert!(matches!(bad_glob, Err(PipelineError::ConfigError(_))));

    let bad_ext = ConfigFileBuilder::new().with_extensions(&["coffee"]).try_build();
    assert!(matches!(bad_ext, Err(PipelineError::ConfigError(_))));

    let bad_queue = ConfigFileBuilder::new()
        .with_queue(TriggerWhileRunningBehaviour::Queue, 0)
        .try_build();
    assert!(matches!(bad_queue, Err(PipelineError::ConfigError(_))));
}

#[test]
fn mistyped_values_fail_to_parse() -> TestResult {
    let dir = tempdir()?;
    write_tree(dir.path(), &[("bad.toml", "[watch]\nqueue_length = \"many\"\n")]);
    let err = load_and_validate(dir.path().join("bad.toml")).unwrap_err();
    assert!(matches!(err, PipelineError::TomlError(_)));
    Ok(())
}

#[test]
fn missing_explicit_config_is_an_error() {
    let err = resolve_config(Some("/definitely/not/here/Assetpipe.toml")).unwrap_err();
    assert!(matches!(err, PipelineError::IoError(_)));
}

#[test]
fn task_names_parse_with_aliases() {
    assert_eq!(TaskKind::from_str("default"), Ok(TaskKind::Watch));
    assert_eq!(TaskKind::from_str("browserify"), Ok(TaskKind::BundleScript));
    assert_eq!(TaskKind::from_str("sass"), Ok(TaskKind::Styles));
    assert_eq!(TaskKind::from_str(" Build "), Ok(TaskKind::Build));
    assert!(TaskKind::from_str("deploy").is_err());

    for kind in TaskKind::ALL {
        assert_eq!(TaskKind::from_str(kind.as_str()), Ok(kind));
    }
}

#[test]
fn default_config_matches_builder_defaults() {
    let built = ConfigFileBuilder::new().build();
    let default = ConfigFile::default();
    assert_eq!(built.styles().src, default.styles().src);
    assert!(built.bundle_configs().is_empty());
}
