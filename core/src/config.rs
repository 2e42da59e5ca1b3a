//! Client configuration loaded from TOML.
//!
//! ```toml
//! game_id = 12345
//! private_key = "..."
//! auto_login = true
//! credentials_path = ".gj-credentials"
//! ```
//!
//! `base_url`, `api_root` and `api_version` default to the public API and
//! only need overriding for a mock or proxy.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.gamejolt.com";
pub const DEFAULT_API_ROOT: &str = "/api/game/";
pub const DEFAULT_API_VERSION: &str = "v1_2";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_root: String,
    pub api_version: String,
    pub game_id: u32,
    pub private_key: String,
    pub credentials_path: Option<PathBuf>,
    pub auto_login: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            game_id: 0,
            private_key: String::new(),
            credentials_path: None,
            auto_login: false,
        }
    }
}

impl ClientConfig {
    pub fn new(game_id: u32, private_key: impl Into<String>) -> Self {
        Self {
            game_id,
            private_key: private_key.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ApiError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Override credentials from `GAMEJOLT_GAME_ID` / `GAMEJOLT_PRIVATE_KEY`.
    pub fn apply_env(self) -> Result<Self, ApiError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        if let Some(id) = lookup("GAMEJOLT_GAME_ID") {
            self.game_id = id
                .trim()
                .parse()
                .map_err(|_| ApiError::Config(format!("GAMEJOLT_GAME_ID is not a number: {id}")))?;
        }
        if let Some(key) = lookup("GAMEJOLT_PRIVATE_KEY") {
            self.private_key = key;
        }
        Ok(self)
    }

    /// `base_url + api_root + api_version`, with duplicate slashes removed at
    /// the joins.
    pub fn api_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_root.trim_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}
