//! Lineage Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.lineage/config.toml`
//! - Local config: `.lineage/config.toml` (in the project directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::{ConfigError, ConfigKey, ConfigLayer};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration for Lineage.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LineageConfig {
    /// Graph construction settings
    pub builder: BuilderSettings,

    /// Canonical resolution settings
    pub resolver: ResolverSettings,

    /// Built-graph cache settings
    pub cache: CacheSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Graph construction settings.
///
/// # Example TOML
///
/// ```toml
/// [builder]
/// strict_integrity = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuilderSettings {
    /// Fail the build on any integrity warning instead of dropping bad records
    pub strict_integrity: bool,
}

/// Canonical resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Let outputs of pending transforms compete for a slot
    pub include_pending: bool,

    /// Payload fields holding the episode index, tried in order
    pub index_fields: Vec<String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            include_pending: true,
            index_fields: vec!["episode_number".to_string(), "episodeNumber".to_string()],
        }
    }
}

/// Built-graph cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of project revisions kept in memory
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,

    /// Log file path (optional)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid(
                ConfigKey::LoggingFormat,
                format!("unknown format '{}'. Valid values: text, json", s),
            )),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override strict integrity checking
    pub strict_integrity: Option<bool>,

    /// Override whether pending outputs compete
    pub include_pending: Option<bool>,

    /// Override cache capacity
    pub cache_capacity: Option<usize>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override log format
    pub log_format: Option<LogFormat>,
}

impl LineageConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(strict) = overrides.strict_integrity {
            self.builder.strict_integrity = strict;
        }

        if let Some(include_pending) = overrides.include_pending {
            self.resolver.include_pending = include_pending;
        }

        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = capacity;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.index_fields.is_empty() {
            return Err(ConfigError::invalid(
                ConfigKey::ResolverIndexFields,
                "at least one field name is required",
            ));
        }
        if self.resolver.index_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::invalid(
                ConfigKey::ResolverIndexFields,
                "field names must not be blank",
            ));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::invalid(
                ConfigKey::CacheCapacity,
                "must be at least 1",
            ));
        }
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid(
                ConfigKey::LoggingLevel,
                format!(
                    "unknown level '{}'. Valid values: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
        Ok(())
    }
}
