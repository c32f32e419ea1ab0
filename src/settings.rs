//! Layered configuration: defaults, then an optional TOML file, then
//! `COROWATCH_*` environment variables.
//!
//! Nested keys use a double underscore in the environment, for example
//! `COROWATCH_PROMETHEUS__LISTEN_ADDR=0.0.0.0:9645`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "COROWATCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run the corosync tools through `sudo`. Defaults to `true`.
    pub use_sudo: bool,

    /// Time between collection cycles.
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub interval: Duration,

    /// Filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Directories searched for the tools instead of `PATH`.
    pub search_path: Option<String>,

    pub output: OutputSettings,

    /// Presence of the `[prometheus]` table enables the scrape endpoint.
    pub prometheus: Option<PrometheusSettings>,

    /// Presence of the `[otel]` table enables OTLP export.
    pub otel: Option<OtelSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_sudo: true,
            interval: Duration::from_secs(10),
            log_level: "info".to_string(),
            search_path: None,
            output: OutputSettings::default(),
            prometheus: None,
            otel: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// JSON file overwritten with every batch.
    pub file: Option<PathBuf>,
    /// `host:port` receiving newline-delimited JSON.
    pub tcp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PrometheusSettings {
    pub listen_addr: Option<String>,
    pub metrics_path: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtelSettings {
    pub endpoint: Option<String>,
    pub service_name: Option<String>,
}

impl Settings {
    /// Load settings from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(path, environment())
    }

    fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder.add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Message(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
