//! Store and logging configuration.
//!
//! # Responsibility
//! - Describe where the store lives and how its connection is tuned.
//! - Describe the rolling file logger used by `init_logging`.
//!
//! # Invariants
//! - Every field has a default, so partial documents deserialize.
//! - `validate()` must pass before a config is used to open anything.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_WORKER_THREAD_NAME: &str = "storekit-bg";
const DEFAULT_LOG_BASENAME: &str = "storekit";
const DEFAULT_MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;

/// Where the backing SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StoreLocation {
    /// Private in-memory database, discarded when the store closes.
    Memory,
    /// Database file on disk; created when missing.
    File { path: PathBuf },
}

impl StoreLocation {
    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
        }
    }
}

/// Options for `Store::open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// How long a blocked statement waits for a competing writer.
    pub busy_timeout_ms: u64,
    /// Switches file databases to write-ahead logging. Ignored in memory.
    pub wal: bool,
    /// Name given to the background worker thread.
    pub worker_thread_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::Memory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            wal: true,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File { path: path.into() },
            ..Self::default()
        }
    }

    /// Checks the config before it is used to open a connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let StoreLocation::File { path } = &self.location {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath);
            }
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "busy_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "worker_thread_name",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Options for `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    pub file_basename: String,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: PathBuf::new(),
            file_basename: DEFAULT_LOG_BASENAME.to_string(),
            max_file_size_bytes: DEFAULT_MAX_LOG_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    /// Checks the rotation settings before the logger is started.
    ///
    /// Level and directory are normalized by `init_logging` itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_basename.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "file_basename",
                message: "must not be empty".to_string(),
            });
        }
        if self.max_file_size_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_file_size_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_files",
                message: "must keep at least one file".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyPath,
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "store file path must not be empty"),
            Self::InvalidValue { field, message } => write!(f, "invalid `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, LogConfig, StoreConfig, StoreLocation};
    use std::path::PathBuf;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"location":{"mode":"file","path":"/tmp/notes.db"}}"#)
                .expect("file config should parse");

        assert_eq!(
            config.location,
            StoreLocation::File {
                path: PathBuf::from("/tmp/notes.db")
            }
        );
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert!(config.wal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_means_in_memory() {
        let config: StoreConfig = serde_json::from_str("{}").expect("empty config should parse");
        assert_eq!(config, StoreConfig::in_memory());
    }

    #[test]
    fn validate_rejects_empty_path_and_zero_timeout() {
        assert_eq!(
            StoreConfig::file("").validate(),
            Err(ConfigError::EmptyPath)
        );

        let config = StoreConfig {
            busy_timeout_ms: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "busy_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn log_config_reads_level_and_keeps_rotation_defaults() {
        let config: LogConfig =
            serde_json::from_str(r#"{"level":"warn","log_dir":"/var/log/storekit"}"#)
                .expect("log config should parse");
        assert_eq!(config.level, "warn");
        assert_eq!(config.file_basename, "storekit");
        assert_eq!(config.max_files, 5);
    }

    #[test]
    fn log_config_validate_rejects_empty_rotation_settings() {
        let valid = LogConfig::new("info", "/var/log/storekit");
        assert!(valid.validate().is_ok());

        let config = LogConfig {
            max_files: 0,
            ..valid.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "max_files",
                ..
            })
        ));

        let config = LogConfig {
            max_file_size_bytes: 0,
            ..valid.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "max_file_size_bytes",
                ..
            })
        ));

        let config = LogConfig {
            file_basename: " ".to_string(),
            ..valid
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "file_basename",
                ..
            })
        ));
    }
}
