use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

impl Token {
    /// True once the token is within four minutes of expiring.
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + 240 >= self.obtained_at + self.expires_in
    }

    pub fn access(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub state: String,
    pub token: Option<Token>,
}

/// Bearer token used for one export run. Never written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// The authenticated Spotify user an export belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub name: String,
    pub owner: String,
    #[tabled(rename = "tracks (reported)")]
    pub reported: String,
    #[tabled(rename = "tracks (exported)")]
    pub exported: usize,
}
