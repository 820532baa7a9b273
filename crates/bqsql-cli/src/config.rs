//! Configuration for the bqsql command line
//!
//! Loads configuration from:
//! 1. config.yaml - connection, compiler and logging settings
//! 2. .env file - picked up by `dotenvy` before loading
//!
//! Environment variables always override config.yaml values.

use bqsql_client::ClientConfig;
use bqsql_dialect::ParamNaming;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Warehouse connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub project_id: Option<String>,
    /// `dataset` or `project.dataset`
    pub dataset_id: Option<String>,
    pub application_name: Option<String>,
    /// Name ingestion-time partition columns are exposed under
    pub partition_column: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset_id: None,
            application_name: Some("bqsql-cli".to_string()),
            partition_column: Some("PARTITIONTIME".to_string()),
        }
    }
}

impl ConnectionConfig {
    pub fn to_client_config(&self, param_naming: ParamNaming) -> Result<ClientConfig, ConfigError> {
        let project_id = self
            .project_id
            .clone()
            .ok_or_else(|| ConfigError::Missing("connection.project_id (BQSQL_PROJECT_ID)".to_string()))?;
        Ok(ClientConfig {
            project_id,
            dataset_id: self.dataset_id.clone(),
            application_name: self.application_name.clone(),
            partition_column: self.partition_column.clone(),
            param_naming,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// `declared` or `generated`
    pub param_naming: ParamNaming,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub compiler: CompilerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Like [`Config::load`], falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // An empty file parses as YAML null
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Override settings from `env`
    pub fn apply_env_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(project) = env("BQSQL_PROJECT_ID") {
            self.connection.project_id = Some(project);
        }
        if let Some(dataset) = env("BQSQL_DATASET_ID") {
            self.connection.dataset_id = Some(dataset);
        }
        if let Some(app) = env("BQSQL_APPLICATION_NAME") {
            self.connection.application_name = Some(app);
        }
        if let Some(column) = env("BQSQL_PARTITION_COLUMN") {
            self.connection.partition_column = (!column.is_empty()).then_some(column);
        }
        if let Some(naming) = env("BQSQL_PARAM_NAMING") {
            self.compiler.param_naming = match naming.as_str() {
                "declared" => ParamNaming::Declared,
                "generated" => ParamNaming::Generated,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BQSQL_PARAM_NAMING".to_string(),
                        value: naming,
                    })
                }
            };
        }

        if let Some(level) = env("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = env("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(output) = env("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Some(dir) = env("LOG_DIR") {
            self.logging.directory = dir;
        }
        Ok(())
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}
