// tests/watch_routing.rs

mod common;
use crate::common::{init_tracing, mock_fs};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe::watch::dag_filter::has_dependent_in_matching;
use assetpipe::watch::hash::{compute_aggregate_hash, compute_file_hash, MemoryHashStore};
use assetpipe::watch::path_utils::relative_str;
use assetpipe::watch::patterns::collect_matching_files;
use assetpipe::watch::{build_pipeline_profiles, ChangeRouter, TaskWatchProfile};
use assetpipe_test_utils::builders::ConfigFileBuilder;

fn router(fs: &assetpipe::fs::MockFileSystem, use_hash: bool) -> ChangeRouter {
    let cfg = ConfigFileBuilder::new().with_use_hash(use_hash).build();
    let profiles = build_pipeline_profiles(&cfg).unwrap();
    ChangeRouter::new(PathBuf::from("."), profiles, Arc::new(fs.clone()))
}

#[test]
fn pipeline_profiles_follow_source_globs() {
    let cfg = ConfigFileBuilder::new().build();
    let profiles = build_pipeline_profiles(&cfg).unwrap();

    let names: Vec<&str> = profiles.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["images", "styles", "markup"]);

    let styles = &profiles[1];
    assert_eq!(styles.deps(), ["images".to_string()]);
    assert!(styles.matches("scss/site.scss"));
    assert!(!styles.matches("scss/vendor/site.scss"));
    assert!(!styles.matches("build/site.css"));
}

#[test]
fn changes_route_to_their_task() {
    init_tracing();
    let fs = mock_fs(&[
        ("scss/site.scss", "a {}"),
        ("docs/index.html", "<p/>"),
        ("images/a.png", "png"),
    ]);
    let mut router = router(&fs, false);

    assert_eq!(router.route(Path::new("scss/site.scss")), vec!["styles"]);
    assert_eq!(router.route(Path::new("docs/index.html")), vec!["markup"]);
    assert_eq!(router.route(Path::new("images/a.png")), vec!["images"]);
    assert!(router.route(Path::new("build/site.css")).is_empty());
    assert!(router.route(Path::new("js/app.js")).is_empty());
}

#[test]
fn only_the_most_downstream_match_is_triggered() {
    let mut dep_map = HashMap::new();
    dep_map.insert("images".to_string(), vec![]);
    dep_map.insert("styles".to_string(), vec!["images".to_string()]);
    dep_map.insert("build".to_string(), vec!["styles".to_string()]);

    let matching: HashSet<String> = ["images", "build"].iter().map(|s| s.to_string()).collect();
    assert!(has_dependent_in_matching("images", &matching, &dep_map));
    assert!(!has_dependent_in_matching("build", &matching, &dep_map));

    // Overlapping globs: a file matching both images and styles only
    // triggers styles, which pulls images into its run.
    let profiles = vec![
        TaskWatchProfile::new("images", vec![], &["shared/**".to_string()], &[], false).unwrap(),
        TaskWatchProfile::new(
            "styles",
            vec!["images".to_string()],
            &["shared/*.scss".to_string()],
            &[],
            false,
        )
        .unwrap(),
    ];
    let fs = mock_fs(&[("shared/a.scss", "")]);
    let mut router = ChangeRouter::new(PathBuf::from("."), profiles, Arc::new(fs));
    assert_eq!(router.route(Path::new("shared/a.scss")), vec!["styles"]);
}

#[test]
fn exclude_globs_win_over_includes() {
    let profile = TaskWatchProfile::new(
        "livereload",
        vec![],
        &["build/**".to_string()],
        &["build/**/*.map".to_string()],
        false,
    )
    .unwrap();
    assert!(profile.matches("build/bundle.js"));
    assert!(!profile.matches("build/bundle.js.map"));
}

#[test]
fn unchanged_content_is_not_retriggered_with_use_hash() {
    init_tracing();
    let fs = mock_fs(&[("scss/site.scss", "a { color: red; }"), ("scss/b.scss", "b {}")]);
    let mut router = router(&fs, true);
    router.prime();

    // Saved again without edits.
    fs.touch("scss/site.scss");
    assert!(router.route(Path::new("scss/site.scss")).is_empty());

    fs.add_file("scss/site.scss", "a { color: blue; }");
    assert_eq!(router.route(Path::new("scss/site.scss")), vec!["styles"]);

    // Same content as last routed state.
    assert!(router.route(Path::new("scss/site.scss")).is_empty());
}

#[test]
fn without_use_hash_every_event_triggers() {
    let fs = mock_fs(&[("docs/a.html", "x")]);
    let mut router = router(&fs, false);
    router.prime();
    assert_eq!(router.route(Path::new("docs/a.html")), vec!["markup"]);
    assert_eq!(router.route(Path::new("docs/a.html")), vec!["markup"]);
}

#[test]
fn hashes_are_stable_and_content_based() {
    let fs = mock_fs(&[("a.txt", "hello world"), ("b.txt", "hello world")]);
    let a = compute_file_hash(&fs, Path::new("a.txt")).unwrap();
    let b = compute_file_hash(&fs, Path::new("b.txt")).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, blake3::hash(b"hello world").to_hex().to_string());

    let agg1 = compute_aggregate_hash(&[a.clone(), b.clone()]);
    let agg2 = compute_aggregate_hash(&[a, b]);
    assert_eq!(agg1, agg2);

    let mut store = MemoryHashStore::new();
    assert!(store.save("styles", agg1.clone()));
    assert!(!store.save("styles", agg1.clone()));
    assert_eq!(store.load("styles"), Some(agg1.as_str()));
    assert!(store.save("styles", "other".to_string()));
}

#[test]
fn matching_files_are_collected_below_glob_bases_only() {
    let fs = mock_fs(&[
        ("scss/site.scss", ""),
        ("scss/_vars.scss", ""),
        ("scss/notes.txt", ""),
        ("elsewhere/x.scss", ""),
    ]);
    let profile =
        TaskWatchProfile::new("styles", vec![], &["scss/*.scss".to_string()], &[], true).unwrap();

    let files = collect_matching_files(&fs, Path::new("."), &profile).unwrap();
    assert_eq!(
        files,
        vec![PathBuf::from("scss/_vars.scss"), PathBuf::from("scss/site.scss")]
    );
}

#[test]
fn relative_paths_use_forward_slashes() {
    assert_eq!(
        relative_str(Path::new("/srv/site"), Path::new("/srv/site/scss/a.scss")),
        Some("scss/a.scss".to_string())
    );
    assert_eq!(
        relative_str(Path::new("."), Path::new("./docs/a.html")),
        Some("docs/a.html".to_string())
    );
    assert_eq!(relative_str(Path::new("/srv/site"), Path::new("/tmp/x")), None);
}
