//! CLI configuration loaded from `ROSTER_*` environment variables.
//!
//! Everything is read and validated once at startup.

use std::env;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_PAGE_SIZE: i64 = 5;
const DEFAULT_SEED_MEMBERS: u32 = 100;

/// Configuration error.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite file; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Logging stays off unless this is set.
    pub log_dir: Option<String>,
    pub page_size: i64,
    /// Demo members inserted into an empty store.
    pub seed_members: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = non_empty("ROSTER_DB_PATH").map(PathBuf::from);

        let log_level = non_empty("ROSTER_LOG_LEVEL")
            .unwrap_or_else(|| roster_core::default_log_level().to_string());

        let log_dir = non_empty("ROSTER_LOG_DIR");
        if let Some(dir) = &log_dir {
            if !PathBuf::from(dir).is_absolute() {
                return Err(ConfigError {
                    field: "ROSTER_LOG_DIR",
                    message: format!("must be an absolute path, got '{dir}'"),
                });
            }
        }

        let page_size = match non_empty("ROSTER_PAGE_SIZE") {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError {
                        field: "ROSTER_PAGE_SIZE",
                        message: format!("expected a positive integer, got '{raw}'"),
                    })
                }
            },
        };

        let seed_members = match non_empty("ROSTER_SEED_MEMBERS") {
            None => DEFAULT_SEED_MEMBERS,
            Some(raw) => raw.trim().parse::<u32>().map_err(|err| ConfigError {
                field: "ROSTER_SEED_MEMBERS",
                message: format!("invalid count '{raw}': {err}"),
            })?,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            page_size,
            seed_members,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.db_path, None);
        assert_eq!(config.log_dir, None);
        assert_eq!(config.log_level, roster_core::default_log_level());
        assert_eq!(config.page_size, 5);
        assert_eq!(config.seed_members, 100);
    }

    #[test]
    fn explicit_values_are_used() {
        let config = load(&[
            ("ROSTER_DB_PATH", "/tmp/roster.sqlite3"),
            ("ROSTER_LOG_LEVEL", "warn"),
            ("ROSTER_PAGE_SIZE", "20"),
            ("ROSTER_SEED_MEMBERS", "0"),
        ])
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/roster.sqlite3")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.seed_members, 0);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("ROSTER_DB_PATH", "  "), ("ROSTER_PAGE_SIZE", "")]).unwrap();
        assert_eq!(config.db_path, None);
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn invalid_page_size_is_rejected() {
        for raw in ["0", "-3", "five"] {
            let err = load(&[("ROSTER_PAGE_SIZE", raw)]).unwrap_err();
            assert_eq!(err.field, "ROSTER_PAGE_SIZE");
        }
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = load(&[("ROSTER_LOG_DIR", "logs")]).unwrap_err();
        assert_eq!(err.field, "ROSTER_LOG_DIR");
    }

    #[test]
    fn invalid_seed_count_is_rejected() {
        let err = load(&[("ROSTER_SEED_MEMBERS", "-1")]).unwrap_err();
        assert_eq!(err.field, "ROSTER_SEED_MEMBERS");
    }
}
