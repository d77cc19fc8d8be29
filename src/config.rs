// ABOUTME: Configuration types and parsing for slipway.yml.
// ABOUTME: Machine-level status contexts plus the managed-deployment port range.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::types::StatusContext;

pub const CONFIG_FILENAME: &str = "slipway.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Machine-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Context used for the neutral "no significant change" status.
    #[serde(default = "default_immaterial_context")]
    pub immaterial_context: StatusContext,

    /// Context used to report selection errors, distinct from any goal.
    #[serde(default = "default_selection_context")]
    pub selection_context: StatusContext,

    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Port range and process teardown settings for managed local deployments.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Lowest port handed out to a deployed app.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Highest port handed out; allocation beyond it is port exhaustion.
    #[serde(default = "default_max_port")]
    pub max_port: u16,

    /// How long to wait for a terminated process to actually exit.
    #[serde(default = "default_stop_grace", with = "humantime_serde")]
    pub stop_grace: Duration,
}

fn default_immaterial_context() -> StatusContext {
    StatusContext::new("slipway/immaterial").expect("static context is valid")
}

fn default_selection_context() -> StatusContext {
    StatusContext::new("slipway/selection").expect("static context is valid")
}

fn default_base_port() -> u16 {
    8080
}

fn default_max_port() -> u16 {
    8180
}

fn default_stop_grace() -> Duration {
    Duration::from_secs(10)
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            immaterial_context: default_immaterial_context(),
            selection_context: default_selection_context(),
            deploy: DeployConfig::default(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            base_port: default_base_port(),
            max_port: default_max_port(),
            stop_grace: default_stop_grace(),
        }
    }
}

impl MachineConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Invalid` if the port range is empty.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: MachineConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.deploy.base_port > self.deploy.max_port {
            return Err(ConfigError::Invalid(format!(
                "base_port {} exceeds max_port {}",
                self.deploy.base_port, self.deploy.max_port
            )));
        }
        Ok(())
    }
}
