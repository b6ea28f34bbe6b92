// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{StyleOutput, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// Every section is optional; an empty file describes the default layout:
///
/// ```toml
/// [styles]
/// src = ["scss/*.{sass,scss}"]
/// dest = "build"
///
/// [images]
/// src = ["images/**"]
/// dest = "build/images"
///
/// [markup]
/// src = ["docs/**"]
/// dest = "build"
///
/// [bundle]
/// source_maps = true
/// extensions = [".coffee"]
///
/// [[bundle.configs]]
/// entry = "js/app.js"
/// dest = "build"
/// output_name = "bundle.js"
/// ```
///
/// All paths and globs are relative to the project root (the directory
/// holding the config file).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub markup: MarkupConfig,

    #[serde(default)]
    pub bundle: BundleSection,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub notify: NotifySettings,

    #[serde(default)]
    pub livereload: LiveReloadSettings,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// `Default`, so holders can rely on globs compiling and bundle outputs being
/// disjoint.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    styles: StylesConfig,
    images: ImagesConfig,
    markup: MarkupConfig,
    bundle: BundleSection,
    watch: WatchSettings,
    notify: NotifySettings,
    livereload: LiveReloadSettings,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            styles: raw.styles,
            images: raw.images,
            markup: raw.markup,
            bundle: raw.bundle,
            watch: raw.watch,
            notify: raw.notify,
            livereload: raw.livereload,
        }
    }

    pub fn styles(&self) -> &StylesConfig {
        &self.styles
    }

    pub fn images(&self) -> &ImagesConfig {
        &self.images
    }

    pub fn markup(&self) -> &MarkupConfig {
        &self.markup
    }

    pub fn bundle_configs(&self) -> &[BundleConfig] {
        &self.bundle.configs
    }

    /// Options shared by every bundle context.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            source_maps: self.bundle.source_maps,
            extensions: self.bundle.extensions.clone(),
        }
    }

    pub fn watch(&self) -> &WatchSettings {
        &self.watch
    }

    pub fn notify(&self) -> &NotifySettings {
        &self.notify
    }

    pub fn livereload(&self) -> &LiveReloadSettings {
        &self.livereload
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile::new_unchecked(RawConfigFile::default())
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesConfig {
    #[serde(default = "default_styles_src")]
    pub src: Vec<String>,

    #[serde(default = "default_dest")]
    pub dest: PathBuf,

    /// `"expanded"` (default) or `"compressed"`.
    #[serde(default)]
    pub output_style: StyleOutput,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            src: default_styles_src(),
            dest: default_dest(),
            output_style: StyleOutput::default(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_images_src")]
    pub src: Vec<String>,

    #[serde(default = "default_images_dest")]
    pub dest: PathBuf,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            src: default_images_src(),
            dest: default_images_dest(),
        }
    }
}

/// `[markup]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupConfig {
    #[serde(default = "default_markup_src")]
    pub src: Vec<String>,

    #[serde(default = "default_dest")]
    pub dest: PathBuf,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            src: default_markup_src(),
            dest: default_dest(),
        }
    }
}

/// `[bundle]` section: shared build options plus one entry per bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSection {
    /// Emit a `.map` sibling next to each bundle.
    #[serde(default = "default_true")]
    pub source_maps: bool,

    /// Extra extensions tried when resolving `require` requests, on top of
    /// `.js` and `.json`.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// A separate bundle is produced for each entry.
    #[serde(default = "default_bundle_configs")]
    pub configs: Vec<BundleConfig>,
}

impl Default for BundleSection {
    fn default() -> Self {
        Self {
            source_maps: true,
            extensions: default_extensions(),
            configs: default_bundle_configs(),
        }
    }
}

/// One independently bundled entry point (`[[bundle.configs]]`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BundleConfig {
    pub entry: PathBuf,
    #[serde(default = "default_dest")]
    pub dest: PathBuf,
    pub output_name: String,
}

impl BundleConfig {
    pub fn new(
        entry: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            entry: entry.into(),
            dest: dest.into(),
            output_name: output_name.into(),
        }
    }

    /// Output path relative to the project root.
    pub fn output_path(&self) -> PathBuf {
        self.dest.join(&self.output_name)
    }
}

/// Global options read by every bundle pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub source_maps: bool,
    pub extensions: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source_maps: true,
            extensions: default_extensions(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSettings {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Only trigger when the hashed content of a task's sources changed.
    #[serde(default)]
    pub use_hash: bool,

    /// Debounce window for script dependency changes.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            triggered_while_running: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            use_hash: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifySettings {
    /// Send compile errors to the desktop notification center. When false,
    /// they are only logged.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `[livereload]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReloadSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_livereload_host")]
    pub host: String,

    #[serde(default = "default_livereload_port")]
    pub port: u16,

    /// Output files whose changes are pushed to browsers.
    #[serde(default = "default_livereload_watch")]
    pub watch: Vec<String>,

    #[serde(default = "default_livereload_exclude")]
    pub exclude: Vec<String>,
}

impl Default for LiveReloadSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_livereload_host(),
            port: default_livereload_port(),
            watch: default_livereload_watch(),
            exclude: default_livereload_exclude(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_dest() -> PathBuf {
    PathBuf::from("build")
}

fn default_styles_src() -> Vec<String> {
    vec!["scss/*.{sass,scss}".to_string()]
}

fn default_images_src() -> Vec<String> {
    vec!["images/**".to_string()]
}

fn default_images_dest() -> PathBuf {
    PathBuf::from("build/images")
}

fn default_markup_src() -> Vec<String> {
    vec!["docs/**".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec![".coffee".to_string()]
}

fn default_bundle_configs() -> Vec<BundleConfig> {
    vec![BundleConfig::new("js/app.js", "build", "bundle.js")]
}

fn default_queue_length() -> usize {
    1
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_livereload_host() -> String {
    "127.0.0.1".to_string()
}

fn default_livereload_port() -> u16 {
    35729
}

fn default_livereload_watch() -> Vec<String> {
    vec!["build/**".to_string()]
}

fn default_livereload_exclude() -> Vec<String> {
    vec!["build/**/*.map".to_string()]
}
