// Credential providers: where the auth token and local player id come from.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::protocol::PlayerId;

/// Source of the session token and the local player's id.
///
/// Queried at the moment a request or channel is opened, so a token that
/// appears or changes between remounts is picked up.
pub trait CredentialProvider: Send + Sync {
    fn auth_token(&self) -> Option<String>;
    fn player_id(&self) -> Option<PlayerId>;
}

/// Contents of `credentials.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    pub auth_token: Option<String>,
    pub player_id: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Static provider
// ---------------------------------------------------------------------------

/// Fixed credentials, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
    player: Option<PlayerId>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>, player: impl Into<PlayerId>) -> Self {
        StaticCredentials {
            token: Some(token.into()),
            player: Some(player.into()),
        }
    }

    /// No token at all, as for a logged-out user.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn auth_token(&self) -> Option<String> {
        self.token.clone().filter(|t| !t.trim().is_empty())
    }

    fn player_id(&self) -> Option<PlayerId> {
        self.player.clone()
    }
}

// ---------------------------------------------------------------------------
// File provider
// ---------------------------------------------------------------------------

/// Reads `credentials.toml` on every call.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentials { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> CredentialsConfig {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return CredentialsConfig::default(),
        };
        match toml::from_str(&text) {
            Ok(creds) => creds,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", self.path.display(), e);
                CredentialsConfig::default()
            }
        }
    }
}

impl CredentialProvider for FileCredentials {
    fn auth_token(&self) -> Option<String> {
        self.read().auth_token.filter(|t| !t.trim().is_empty())
    }

    fn player_id(&self) -> Option<PlayerId> {
        self.read().player_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
