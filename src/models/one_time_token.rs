//! One-time token model - single-use, time-bound recovery tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use token for passwordless recovery/login. Consumption is a
/// terminal transition; a consumed token is never valid again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeToken {
    pub account_id: Uuid,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl OneTimeToken {
    /// Mint a token with a random unguessable value.
    pub fn new(account_id: Uuid, max_age: Duration) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            value: Uuid::new_v4().to_string(),
            expires_at: now + max_age,
            consumed: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
