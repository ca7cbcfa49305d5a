//! Engine configuration.
//!
//! Tunes the reload pipeline, not the behaviors themselves (those live in the
//! behavior document handled by [`crate::loader`]). Loading is hierarchical:
//! - Default values as code base
//! - Configuration file specified by `BEHAVIOR_CONFIG_PATH`
//! - Environment variable overrides (`BEHAVIOR__WATCHER__DEBOUNCE_IN_MS`, ...)
mod loader;
mod watcher;
use std::fmt::Debug;

pub use loader::*;
pub use watcher::*;
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SEPARATOR;
use crate::Result;

/// Main configuration container for the behavior engine
///
/// Sources are merged with later ones overriding earlier ones:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `BEHAVIOR_CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// File watcher and reload scheduling
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// Behavior document interpretation
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl Debug for EngineConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("watcher", &self.watcher)
            .field("loader", &self.loader)
            .finish()
    }
}

impl EngineConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can still be
    /// applied. Callers must call `validate()` before using the result.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("BEHAVIOR__WATCHER__DEBOUNCE_IN_MS", "250");
    /// let cfg = EngineConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("BEHAVIOR_CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a TOML file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates the watcher timings and returns the validated instance.
    /// Every combination of loader flags is valid.
    pub fn validate(self) -> Result<Self> {
        self.watcher.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
}
