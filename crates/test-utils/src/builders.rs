use std::path::PathBuf;

use assetpipe::config::{BundleConfig, ConfigFile, RawConfigFile};
use assetpipe::errors::Result;
use assetpipe::types::{StyleOutput, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults except for the bundle list, which starts
/// empty.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.bundle.configs.clear();
        Self { config }
    }

    pub fn with_bundle(mut self, bundle: BundleConfig) -> Self {
        self.config.bundle.configs.push(bundle);
        self
    }

    pub fn with_source_maps(mut self, enabled: bool) -> Self {
        self.config.bundle.source_maps = enabled;
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.bundle.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_styles(mut self, src: &[&str], dest: &str) -> Self {
        self.config.styles.src = src.iter().map(|s| s.to_string()).collect();
        self.config.styles.dest = PathBuf::from(dest);
        self
    }

    pub fn with_style_output(mut self, output: StyleOutput) -> Self {
        self.config.styles.output_style = output;
        self
    }

    pub fn with_images(mut self, src: &[&str], dest: &str) -> Self {
        self.config.images.src = src.iter().map(|s| s.to_string()).collect();
        self.config.images.dest = PathBuf::from(dest);
        self
    }

    pub fn with_markup(mut self, src: &[&str], dest: &str) -> Self {
        self.config.markup.src = src.iter().map(|s| s.to_string()).collect();
        self.config.markup.dest = PathBuf::from(dest);
        self
    }

    pub fn with_use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn with_queue(mut self, behaviour: TriggerWhileRunningBehaviour, length: usize) -> Self {
        self.config.watch.triggered_while_running = behaviour;
        self.config.watch.queue_length = length;
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.config.notify.enabled = enabled;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a bundle writing `build/<output_name>`.
pub fn bundle(entry: &str, output_name: &str) -> BundleConfig {
    BundleConfig::new(entry, "build", output_name)
}
