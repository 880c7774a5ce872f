//! Session token persistence
//!
//! The token is stored as JSON in `<cache_dir>/.token`.

use crate::error::{TijoError, TijoResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Token file name inside the cache directory
pub const TOKEN_FILE: &str = ".token";

/// Bearer token issued by `/auth/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub token: String,
    pub refresh_token: String,

    /// Expiry in milliseconds since the epoch
    #[serde(rename = "time")]
    pub expiration_time: i64,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expiration_time <= chrono::Utc::now().timestamp_millis()
    }

    /// Read a token file. Missing or malformed files yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(token) => {
                debug!(path = %path.display(), "loaded token");
                Some(token)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed token file");
                None
            }
        }
    }

    /// Write the token file, creating its directory if needed
    pub fn save(&self, path: &Path) -> TijoResult<()> {
        debug!(path = %path.display(), "saving token");
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(TijoError::IoError)
    }
}

/// Return the bearer string of a valid token.
///
/// Distinguishes a client that never logged in from one whose token lapsed,
/// so callers can choose between logging in and refreshing.
pub fn bearer(token: Option<&Token>) -> TijoResult<&str> {
    match token {
        Some(token) if !token.is_expired() => Ok(token.token.as_str()),
        Some(_) => Err(TijoError::TokenExpired),
        None => Err(TijoError::NotAuthenticated),
    }
}
