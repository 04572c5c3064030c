//! Load the WeCom application's identity from a JSON file.
//!
//! By default the file lives at `~/.config/wxwork.json`; set `$WXWORK_CONFIG`
//! to point elsewhere.
//!
//! ```json
//! {
//!     "cropid": "ww0123456789abcdef",
//!     "agentid": 1000002,
//!     "secret": "..."
//! }
//! ```

use crate::wecom::auth::Account;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

/// Overrides the default configuration file location.
pub const CONFIG_ENV: &str = "WXWORK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The configuration file's contents. The corp ID key really is spelt
/// `cropid`.
#[derive(Deserialize)]
pub struct Config {
    #[serde(rename = "cropid")]
    pub corp_id: String,
    #[serde(rename = "agentid")]
    pub agent_id: i64,
    pub secret: String,
}

impl Config {
    /// `$WXWORK_CONFIG` if set, otherwise `~/.config/wxwork.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".config").join("wxwork.json"))
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Self::default_path()?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading WeCom config from {:?}", path);

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn into_account(self) -> Account {
        Account::new(self.corp_id, self.agent_id, self.secret)
    }
}
