use crate::error::EntrypointError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix for the entrypoint's own knobs. Credentials are not read through here.
pub const ENV_PREFIX: &str = "ENTRYPOINT_";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub loglevel: String,
    /// Directory scanned for user-supplied init scripts.
    pub init_dir: PathBuf,
    /// Unprivileged account the server runs as.
    pub service_user: String,
    pub zoneinfo_dir: PathBuf,
    /// Command name that triggers the bootstrap flow; anything else is exec'd untouched.
    pub server_command: String,
    pub client: String,
    pub admin: String,
    pub tzinfo_to_sql: String,
    pub shell: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            init_dir: PathBuf::from("/docker-entrypoint-initdb.d"),
            service_user: "mysql".to_string(),
            zoneinfo_dir: PathBuf::from("/usr/share/zoneinfo"),
            server_command: "mysqld".to_string(),
            client: "mysql".to_string(),
            admin: "mysqladmin".to_string(),
            tzinfo_to_sql: "mysql_tzinfo_to_sql".to_string(),
            shell: "bash".to_string(),
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_env() -> Result<Self, EntrypointError> {
        Ok(Self::figment().extract()?)
    }
}
