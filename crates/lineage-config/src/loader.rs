//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.lineage/config.toml`
//! 2. Local config: `.lineage/config.toml` (in the project directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::{ConfigError, ConfigLayer};
use crate::{
    BuilderSettings, CacheSettings, ConfigOverrides, LineageConfig, LoggingConfig,
    ResolverSettings,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".lineage";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".lineage";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.lineage`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<LineageConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.lineage`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a project directory.
    pub fn local_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a project directory with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates
    /// the result.
    pub fn load(
        &mut self,
        project_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<LineageConfig, ConfigError> {
        let mut config = LineageConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(project_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a single config file over the defaults, skipping the global and
    /// local lookup.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<LineageConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(
            LineageConfig::default(),
            load_config_file(path, ConfigLayer::Explicit)?,
        );

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<LineageConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path, ConfigLayer::Global)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a project directory.
    pub fn load_local(&self, project_root: &Path) -> Result<Option<LineageConfig>, ConfigError> {
        let local_path = self.local_config_path(project_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path, ConfigLayer::Local).map(Some)
    }

    /// Save configuration to the local config file for a project directory.
    pub fn save_local(&self, project_root: &Path, config: &LineageConfig) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(project_root);
        save_config_file(&local_path, config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.lineage/config.toml` with default configuration. An
    /// existing file is left untouched.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_dir(global_dir)
    }

    /// Initialize local configuration for a project directory.
    ///
    /// Creates `.lineage/config.toml` with default configuration.
    pub fn init_local(&self, project_root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&project_root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::write(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &LineageConfig::default())?;
    }

    Ok(config_path)
}

/// Load one configuration layer from disk.
///
/// The layer is validated on its own so a bad value is reported against the
/// file that set it. Unset fields hold defaults, which always validate.
fn load_config_file(path: &Path, layer: ConfigLayer) -> Result<LineageConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(layer, path, e))?;

    let config: LineageConfig =
        toml::from_str(&content).map_err(|e| ConfigError::parse(layer, path, e))?;
    config.validate().map_err(|e| e.in_file(path))?;
    Ok(config)
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &LineageConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::write(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// A field in `overlay` that still holds its default value does not replace
/// the base value, so partial config files only change what they name.
fn merge_configs(base: LineageConfig, overlay: LineageConfig) -> LineageConfig {
    LineageConfig {
        builder: merge_builder(base.builder, overlay.builder),
        resolver: merge_resolver(base.resolver, overlay.resolver),
        cache: merge_cache(base.cache, overlay.cache),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_builder(base: BuilderSettings, overlay: BuilderSettings) -> BuilderSettings {
    BuilderSettings {
        strict_integrity: overlay.strict_integrity || base.strict_integrity,
    }
}

fn merge_resolver(base: ResolverSettings, overlay: ResolverSettings) -> ResolverSettings {
    let defaults = ResolverSettings::default();
    ResolverSettings {
        include_pending: if overlay.include_pending != defaults.include_pending {
            overlay.include_pending
        } else {
            base.include_pending
        },
        // Field lists replace rather than extend; order matters
        index_fields: if overlay.index_fields != defaults.index_fields {
            overlay.index_fields
        } else {
            base.index_fields
        },
    }
}

fn merge_cache(base: CacheSettings, overlay: CacheSettings) -> CacheSettings {
    CacheSettings {
        capacity: if overlay.capacity != CacheSettings::default().capacity {
            overlay.capacity
        } else {
            base.capacity
        },
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: if overlay.format != crate::LogFormat::Text {
            overlay.format
        } else {
            base.format
        },
        file: overlay.file.or(base.file),
    }
}
