//! Layered configuration
//!
//! Sources, lowest to highest priority:
//! 1. built-in defaults
//! 2. a TOML file (`--config` path, else `cue.toml` in the working directory if present)
//! 3. environment variables prefixed `CUE_`, with `__` between sections
//!    (`CUE_INTERPRETER__MAX_LOOP_ITERATIONS=500`)
//!
//! A `.env` file is loaded into the environment first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub logging: LoggingConfig,
}

/// Limits and defaults the dispatcher runs with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Iteration ceiling for `While`
    pub max_loop_iterations: u64,
    /// Upper clamp for `Delay`
    pub max_delay_ms: u64,
    /// Sleep slice between host event pumps while a `Delay` waits
    pub pump_interval_ms: u64,
    /// Error variable for a `TryCatch` that names none
    pub default_error_variable: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 10_000,
            max_delay_ms: 60_000,
            pump_interval_ms: 10,
            default_error_variable: "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with the default search rules
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    /// Render as TOML (what `cue config` prints)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    load_dotenv: bool,
}

impl ConfigBuilder {
    /// Use this file instead of searching for `cue.toml`; the file must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Load `.env` into the process environment before reading variables
    pub fn dotenv(mut self, enabled: bool) -> Self {
        self.load_dotenv = enabled;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.load_dotenv {
            // A missing .env is normal
            let _ = dotenvy::dotenv();
        }

        let defaults = config::Config::try_from(&Config::default())
            .context("Failed to build default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        builder = match &self.config_path {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::with_name("cue").required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("CUE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize::<Config>()
            .context("Invalid configuration")
    }
}
