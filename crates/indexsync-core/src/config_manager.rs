use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for IndexSync
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct IndexSyncConfig {
    /// Automatic indexing behaviour
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What a changeset does with entities whose type is not mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTypePolicy {
    #[default]
    Ignore,
    Fail,
}

impl std::str::FromStr for UnknownTypePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(UnknownTypePolicy::Ignore),
            "fail" => Ok(UnknownTypePolicy::Fail),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid unknown type policy: {}. Must be one of: ignore, fail",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexingConfig {
    /// Reindex containing entities when the entities they depend on change
    #[serde(default = "default_resolve_dependencies")]
    pub resolve_dependencies: bool,

    /// Behaviour for add/update/delete calls on unmapped entity types
    #[serde(default)]
    pub unknown_types: UnknownTypePolicy,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            resolve_dependencies: default_resolve_dependencies(),
            unknown_types: UnknownTypePolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_resolve_dependencies() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with defaults, file loading and env overrides
#[derive(Debug)]
pub struct ConfigManager {
    config: IndexSyncConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables
    /// 2. Config file (`./.indexsync.toml`)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let local_config = Path::new(".indexsync.toml");
        let (config, config_path) = if local_config.exists() {
            (
                Self::read_toml_file(local_config)?,
                Some(local_config.to_path_buf()),
            )
        } else {
            info!("No config file found, using defaults");
            (IndexSyncConfig::default(), None)
        };
        Self::finish(config, config_path)
    }

    /// Load from an explicit file, which must exist.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    /// Parse configuration from TOML text; no env overrides are applied.
    pub fn from_toml_str(content: &str) -> Result<IndexSyncConfig, ConfigError> {
        let config: IndexSyncConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    fn finish(config: IndexSyncConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config)?;
        Self::validate_config(&config)?;

        info!("Configuration loaded");
        if let Some(ref path) = config_path {
            info!("   Config file: {}", path.display());
        }
        info!(
            "   Dependency resolution: {}",
            if config.indexing.resolve_dependencies {
                "enabled"
            } else {
                "disabled"
            }
        );
        info!("   Unknown entity types: {:?}", config.indexing.unknown_types);

        Ok(Self {
            config,
            config_path,
        })
    }

    fn read_toml_file(path: &Path) -> Result<IndexSyncConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: IndexSyncConfig) -> Result<IndexSyncConfig, ConfigError> {
        if let Ok(resolve) = std::env::var("INDEXSYNC_RESOLVE_DEPENDENCIES") {
            config.indexing.resolve_dependencies =
                resolve.to_lowercase() == "true" || resolve == "1";
        }
        if let Ok(policy) = std::env::var("INDEXSYNC_UNKNOWN_TYPES") {
            config.indexing.unknown_types = policy.parse()?;
        }
        if let Ok(level) = std::env::var("INDEXSYNC_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }
        if let Ok(format) = std::env::var("INDEXSYNC_LOG_FORMAT") {
            config.logging.format = format;
        }
        Ok(config)
    }

    fn validate_config(config: &IndexSyncConfig) -> Result<(), ConfigError> {
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &IndexSyncConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn into_config(self) -> IndexSyncConfig {
        self.config
    }
}
