use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use pagewright_core::BuildConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "./pagewright.toml";

/// Complete configuration that merges CLI args, env vars, config file, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PagewrightConfig {
    /// Build paths (from pagewright-core)
    pub build: BuildConfig,
}

impl PagewrightConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (PAGEWRIGHT_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .unwrap_or(None)
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_FILE);

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        builder = builder.add_source(ConfigBuilder::try_from(&Self::default())?);

        // 2. Add configuration file if it exists
        if Path::new(config_file).exists() {
            builder = builder.add_source(File::new(config_file, FileFormat::Toml));
        }

        // 3. Add environment variables, double underscore for nested keys
        builder = builder.add_source(
            Environment::with_prefix("PAGEWRIGHT")
                .prefix_separator("_")
                .separator("__"),
        );

        // 4. Override with CLI arguments that were actually given
        let flags = [
            ("output-path", "build.output"),
            ("templates", "build.templates"),
            ("template-ext", "build.template_extension"),
            ("shared", "build.shared"),
            ("data", "build.data"),
        ];
        for (arg, key) in flags {
            if let Some(value) = args.try_get_one::<String>(arg).unwrap_or(None) {
                builder = builder.set_override(key, value.as_str())?;
            }
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Get the build configuration
    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}
