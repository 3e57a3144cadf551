//! OAuth2 token model - codes, access tokens, and refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scope::ScopeSet;

/// The three token kinds minted by the OAuth2 service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Code,
    AccessToken,
    RefreshToken,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Code => "code",
            TokenKind::AccessToken => "access_token",
            TokenKind::RefreshToken => "refresh_token",
        }
    }
}

/// A stored OAuth2 token. `value` is unique across all tokens of every
/// kind; invalidated or expired tokens are never returned as valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub account_id: Uuid,
    pub client_id: String,
    pub kind: TokenKind,
    pub value: String,
    pub scopes: ScopeSet,
    pub expires_at: DateTime<Utc>,
    pub invalidated: bool,
    pub created_at: DateTime<Utc>,
}

impl OAuthToken {
    pub fn new(
        account_id: Uuid,
        client_id: &str,
        kind: TokenKind,
        value: String,
        scopes: ScopeSet,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            client_id: client_id.to_string(),
            kind,
            value,
            scopes,
            expires_at,
            invalidated: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_live(&self) -> bool {
        !self.invalidated && !self.is_expired()
    }

    /// Seconds until expiry, clamped to zero.
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}
