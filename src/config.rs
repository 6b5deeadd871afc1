use std::env;
use std::path::PathBuf;

use crate::api::DEFAULT_API_PORT;
use crate::session::DEFAULT_SESSION_PORT;

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub api_port: u16,
    pub session_port: u16,
    pub db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            session_port: DEFAULT_SESSION_PORT,
            db_path: PathBuf::from("questions.db"),
        }
    }
}

impl Config {
    /// Build a config from `PODIUM_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_port: port_var("PODIUM_API_PORT").unwrap_or(defaults.api_port),
            session_port: port_var("PODIUM_SESSION_PORT").unwrap_or(defaults.session_port),
            db_path: env::var_os("PODIUM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
        }
    }
}

fn port_var(key: &str) -> Option<u16> {
    env::var(key).ok()?.parse().ok()
}
