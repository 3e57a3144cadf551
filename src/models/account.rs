//! Account model - the root identity every other entity hangs off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account. Inactive accounts reject all authentication; accounts
/// are deactivated rather than deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account. The email is trimmed and lower-cased;
    /// uniqueness is enforced by the store.
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            active: true,
            created_at: Utc::now(),
        }
    }
}
