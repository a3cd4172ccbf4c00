//! Layered configuration: defaults, then a TOML file, then `SNT_*`
//! environment variables.
//!
//! The pairing window and display limits live here rather than as
//! constants inside the grouping passes; the passes themselves stay pure
//! and take these values as arguments.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ResultExt, SynctraceError};

/// Name of the config file searched for in the working directory.
pub const CONFIG_FILE_NAME: &str = "synctrace.toml";

const ENV_PREFIX: &str = "SNT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path of the SQLite status-log database.
    pub db_path: PathBuf,
    /// Maximum gap between an in-progress record and its terminal
    /// counterpart for the pair to be considered one session.
    pub pairing_window_hours: i64,
    /// Bars shown on the execution timeline chart.
    pub chart_limit: usize,
    /// Sessions returned per key unless the caller asks otherwise.
    pub session_limit: usize,
    /// Raw rows fetched per requested session; flow grouping needs a
    /// generous over-fetch to reconstruct the requested number.
    pub fetch_multiplier: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("synctrace.db"),
            pairing_window_hours: 24,
            chart_limit: 20,
            session_limit: 10,
            fetch_multiplier: 20,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicitly given path must exist; otherwise `synctrace.toml` in
    /// the working directory is used when present. Environment variables
    /// override whatever the file set.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_pairs(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .map_err(|e| SynctraceError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `SNT_*` overrides from an explicit variable list.
    ///
    /// Unparsable values are logged and skipped rather than fatal.
    pub fn apply_env_pairs(&mut self, vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DB_PATH" => self.db_path = PathBuf::from(value),
                "PAIRING_WINDOW_HOURS" => {
                    set_numeric(&key, &value, &mut self.pairing_window_hours);
                }
                "CHART_LIMIT" => set_numeric(&key, &value, &mut self.chart_limit),
                "SESSION_LIMIT" => set_numeric(&key, &value, &mut self.session_limit),
                "FETCH_MULTIPLIER" => set_numeric(&key, &value, &mut self.fetch_multiplier),
                _ => {}
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pairing_window_hours <= 0 {
            return Err(SynctraceError::Config(format!(
                "pairing_window_hours must be positive, got {}",
                self.pairing_window_hours
            )));
        }
        if self.fetch_multiplier == 0 {
            return Err(SynctraceError::Config(
                "fetch_multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The pairing window as a duration.
    #[must_use]
    pub fn pairing_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.pairing_window_hours)
    }
}

fn set_numeric<T: std::str::FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(%key, %value, "ignoring unparsable env override"),
    }
}
