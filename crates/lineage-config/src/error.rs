//! Configuration error types.
//!
//! File errors name the layer they came from, so a bad value in
//! `~/.lineage/config.toml` is never reported as a project problem.
//! Validation errors name the offending key as a [`ConfigKey`].

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Source layer of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `~/.lineage/config.toml`
    Global,
    /// `.lineage/config.toml` under the project directory
    Local,
    /// A file passed with `--config`
    Explicit,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigLayer::Global => "global",
            ConfigLayer::Local => "project",
            ConfigLayer::Explicit => "explicit",
        })
    }
}

/// Configuration keys that carry validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ResolverIndexFields,
    CacheCapacity,
    LoggingLevel,
    LoggingFormat,
}

impl ConfigKey {
    /// Dotted TOML path of the key
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::ResolverIndexFields => "resolver.index_fields",
            ConfigKey::CacheCapacity => "cache.capacity",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingFormat => "logging.format",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while loading, validating or writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {layer} config {}: {source}", .path.display())]
    Read {
        layer: ConfigLayer,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{layer} config {} is not valid TOML: {source}", .path.display())]
    Parse {
        layer: ConfigLayer,
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Creating the config directory or writing the file failed
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render config as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// `config init --global` without a home directory
    #[error("no home directory to hold the global config")]
    NoHomeDir,

    /// A value broke a validation rule. `origin` is the file that set it,
    /// `None` when it came from the merged result or a command-line flag.
    #[error("invalid {key}{}: {reason}", origin_suffix(.origin.as_deref()))]
    Invalid {
        key: ConfigKey,
        reason: String,
        origin: Option<PathBuf>,
    },
}

fn origin_suffix(origin: Option<&Path>) -> String {
    origin
        .map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

impl ConfigError {
    pub(crate) fn read(layer: ConfigLayer, path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            layer,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(layer: ConfigLayer, path: &Path, source: toml::de::Error) -> Self {
        Self::Parse {
            layer,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid(key: ConfigKey, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
            origin: None,
        }
    }

    /// Attribute a validation error to the file that set the value.
    /// Other errors pass through unchanged.
    pub(crate) fn in_file(self, path: &Path) -> Self {
        match self {
            Self::Invalid { key, reason, .. } => Self::Invalid {
                key,
                reason,
                origin: Some(path.to_path_buf()),
            },
            other => other,
        }
    }

    /// Key that failed validation, if this is a validation error
    pub fn key(&self) -> Option<ConfigKey> {
        match self {
            Self::Invalid { key, .. } => Some(*key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_names_key_and_file() {
        let err = ConfigError::invalid(ConfigKey::CacheCapacity, "must be at least 1");
        assert_eq!(err.to_string(), "invalid cache.capacity: must be at least 1");
        assert_eq!(err.key(), Some(ConfigKey::CacheCapacity));

        let err = err.in_file(Path::new("/srv/story/.lineage/config.toml"));
        assert_eq!(
            err.to_string(),
            "invalid cache.capacity in /srv/story/.lineage/config.toml: must be at least 1"
        );
    }

    #[test]
    fn test_read_error_names_layer() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read(ConfigLayer::Global, Path::new("/home/u/.lineage/config.toml"), io);

        let message = err.to_string();
        assert!(message.starts_with("cannot read global config /home/u/.lineage/config.toml"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.key(), None);
    }

    #[test]
    fn test_in_file_leaves_io_errors_alone() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ConfigError::write(Path::new("/tmp/a.toml"), io).in_file(Path::new("/tmp/b.toml"));
        assert!(matches!(err, ConfigError::Write { ref path, .. } if path == Path::new("/tmp/a.toml")));
    }
}
