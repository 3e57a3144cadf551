//! Local credential model - username, password hash, optional TOTP spec.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::totp::Totp;
use crate::utils::{verify_password, Password, PasswordHashString};

/// A local username/password credential. Exactly one per account; the
/// username is immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub account_id: Uuid,
    /// Lower-cased, unique across all accounts.
    pub username: String,
    pub password_hash: String,
    /// Serialized otpauth URI when TOTP is enrolled.
    pub totp_spec: Option<String>,
}

impl Credential {
    pub fn new(account_id: Uuid, username: &str, password_hash: PasswordHashString) -> Self {
        Self {
            account_id,
            username: username.trim().to_lowercase(),
            password_hash: password_hash.into_string(),
            totp_spec: None,
        }
    }

    pub fn has_totp(&self) -> bool {
        self.totp_spec.is_some()
    }

    /// Verify a password against the stored hash. Backend failures (a
    /// corrupt hash) count as a mismatch here; callers that need to
    /// distinguish go through [`crate::utils::verify_password`] directly.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(
            &Password::new(password.to_string()),
            &PasswordHashString::new(self.password_hash.clone()),
        )
        .unwrap_or(false)
    }

    /// Verify a TOTP code within the drift window. A credential without a
    /// TOTP spec accepts any code; callers gate on [`Self::has_totp`].
    pub fn verify_totp(&self, code: &str, drift: u32) -> bool {
        match &self.totp_spec {
            None => true,
            Some(spec) => match Totp::parse(spec) {
                Ok(totp) => totp.validate(code, drift),
                Err(_) => false,
            },
        }
    }
}
