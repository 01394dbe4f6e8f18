use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Filter-related constants
// =============================================================================

/// Smallest number of candidates handed to a single worker
pub const DEFAULT_MIN_PARTITION_LEN: usize = 1000;

/// Worker count meaning "one per available core"
pub const AUTO_THREADS: usize = 0;

// =============================================================================
// Logging-related constants
// =============================================================================

/// Default log level when neither the environment nor the config sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV_VAR: &str = "MATCHSPEC_LOG";

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub filter: FilterConfig,
    pub log: LogConfig,
}

/// Parallel filter configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Worker threads; `0` uses every available core
    pub threads: usize,
    /// Catalogs shorter than this are filtered on the calling thread
    pub min_partition_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            threads: AUTO_THREADS,
            min_partition_len: DEFAULT_MIN_PARTITION_LEN,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = config_path();
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the path to the config file for matchspec.
/// Uses $XDG_CONFIG_HOME/matchspec/config.json if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/matchspec/config.json,
/// or ./matchspec/config.json if neither is available.
pub fn config_path() -> PathBuf {
    config_path_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

fn config_path_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join("matchspec").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<Config>(json!({
            "filter": {
                "threads": 4
            }
        }))
        .unwrap();

        assert_eq!(result.filter.threads, 4);
        assert_eq!(result.filter.min_partition_len, DEFAULT_MIN_PARTITION_LEN);
        assert_eq!(result.log, LogConfig::default());
    }

    #[test]
    fn config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<Config>(json!({
            "filter": {
                "threads": 2,
                "minPartitionLen": 50
            },
            "log": {
                "level": "debug",
                "json": true,
                "file": "/tmp/matchspec.log"
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            Config {
                filter: FilterConfig {
                    threads: 2,
                    min_partition_len: 50
                },
                log: LogConfig {
                    level: "debug".to_string(),
                    json: true,
                    file: Some(PathBuf::from("/tmp/matchspec.log")),
                }
            }
        );
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"log": {{"level": "warn"}}}}"#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.log.level, "warn");
        assert_eq!(config.filter, FilterConfig::default());
    }

    #[test]
    fn load_reports_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.json"))).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reports_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn config_path_with_env_uses_xdg_config_home_when_set() {
        let path = config_path_with_env(
            Some("/tmp/test-config".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-config/matchspec/config.json"));
    }

    #[test]
    fn config_path_with_env_falls_back_to_home_config() {
        let path = config_path_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.config/matchspec/config.json"));
    }

    #[test]
    fn config_path_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = config_path_with_env(None, None);
        assert_eq!(path, PathBuf::from("./matchspec/config.json"));
    }
}
