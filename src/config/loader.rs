//! Configuration Loader
//!
//! Locates `run_time_config.json` and loads it through the `config` crate,
//! layering `PULSE_ACTIONS__*` environment overrides on top of the file.
//!
//! Lookup order for the file:
//! 1. an explicit path (the `--config` flag)
//! 2. the `PULSE_ACTIONS_CONFIG` environment variable
//! 3. `run_time_config.json` next to the worker executable

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::WorkerConfig;
use crate::constants::{CONFIG_ENV_PREFIX, RUNTIME_CONFIG_FILE, RUNTIME_CONFIG_PATH_ENV};

/// Loads the worker configuration from one JSON file
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    env_overrides: bool,
}

impl ConfigLoader {
    /// Loader for an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_overrides: true,
        }
    }

    /// Resolve the configuration path from the flag, the environment or the install location
    pub fn discover(explicit: Option<PathBuf>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Ok(path) = env::var(RUNTIME_CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(Self::new(path));
            }
        }

        Ok(Self::new(Self::install_location_path()?))
    }

    /// `run_time_config.json` in the directory holding the executable
    pub fn install_location_path() -> ConfigResult<PathBuf> {
        let exe = env::current_exe().map_err(|e| ConfigurationError::InstallLocation {
            error: e.to_string(),
        })?;
        let dir = exe.parent().ok_or_else(|| ConfigurationError::InstallLocation {
            error: format!("{} has no parent directory", exe.display()),
        })?;
        Ok(dir.join(RUNTIME_CONFIG_FILE))
    }

    /// Ignore `PULSE_ACTIONS__*` environment overrides
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, merge and validate the configuration
    pub fn load(&self) -> ConfigResult<WorkerConfig> {
        if !self.path.is_file() {
            return Err(ConfigurationError::file_not_found(&self.path));
        }

        debug!("Loading runtime configuration from {}", self.path.display());

        let mut builder = Config::builder().add_source(
            File::from(self.path.as_path())
                .format(FileFormat::Json)
                .required(true),
        );
        if self.env_overrides {
            builder = builder.add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let worker_config: WorkerConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ConfigurationError::file_read_error(self.path.display().to_string(), e))?;

        worker_config.validate()?;

        debug!(
            exchange = %worker_config.exchange,
            topic = %worker_config.topic,
            broker_host = %worker_config.broker.host,
            "Runtime configuration loaded"
        );

        Ok(worker_config)
    }
}
