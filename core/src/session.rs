//! Per-client session state and the GameJolt credentials file.
//!
//! The GameJolt desktop client launches games with a `.gj-credentials` file
//! next to the executable: a version line followed by the username and the
//! user token. Older clients wrote only the last two lines.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::Action;

/// Default name of the credentials file written by the GameJolt client.
pub const CREDENTIALS_FILE: &str = ".gj-credentials";

/// Game identity plus the current user, if any.
#[derive(Clone, Default)]
pub struct Session {
    pub(crate) game_id: u32,
    pub(crate) private_key: String,
    pub(crate) username: String,
    pub(crate) user_token: String,
    pub(crate) logged_in: bool,
    pub(crate) last_action: Option<Action>,
}

// The private key and token stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("game_id", &self.game_id)
            .field("username", &self.username)
            .field("logged_in", &self.logged_in)
            .field("last_action", &self.last_action)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(game_id: u32, private_key: impl Into<String>) -> Self {
        Self {
            game_id,
            private_key: private_key.into(),
            ..Default::default()
        }
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    /// Both game credentials must be present before any request is signed.
    pub(crate) fn ensure_configured(&self) -> Result<(), ApiError> {
        if self.private_key.is_empty() {
            return Err(ApiError::MissingCredentials("private key"));
        }
        if self.game_id == 0 {
            return Err(ApiError::MissingCredentials("game id"));
        }
        Ok(())
    }

    pub(crate) fn set_user(&mut self, username: &str, token: &str) {
        self.username = username.to_string();
        self.user_token = token.to_string();
        self.logged_in = false;
    }

    /// Forget the current user. Game credentials are kept.
    pub fn log_off(&mut self) {
        self.logged_in = false;
        self.username.clear();
        self.user_token.clear();
    }
}

/// Username and token read from a credentials file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub version: Option<String>,
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("version", &self.version)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            version: None,
            username: username.into(),
            token: token.into(),
        }
    }

    /// Parse the file contents. Three lines are `version`, `username`,
    /// `token`; two lines are `username`, `token`. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        match lines.as_slice() {
            [version, username, token, ..] => Ok(Self {
                version: Some(version.to_string()),
                username: username.to_string(),
                token: token.to_string(),
            }),
            [username, token] => Ok(Self::new(*username, *token)),
            _ => Err(ApiError::Credentials(format!(
                "expected at least 2 non-empty lines, found {}",
                lines.len()
            ))),
        }
    }

    /// Read a credentials file. A missing file is not an error: the game was
    /// simply not launched through the GameJolt client. A malformed file is
    /// logged and returned as `ApiError::Credentials`.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ApiError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no credentials file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match Self::parse(&text) {
            Ok(creds) => Ok(Some(creds)),
            Err(e) => {
                warn!(path = %path.display(), "malformed credentials file: {e}");
                Err(e)
            }
        }
    }
}
