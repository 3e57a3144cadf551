//! TOTP enrollment service - secrets, otpauth specs, drift policy.

use crate::config::TotpConfig;
use crate::totp::{encode_secret, generate_secret, Totp};

use super::error::AuthError;

#[derive(Clone)]
pub struct TwoFactorService {
    config: TotpConfig,
}

impl TwoFactorService {
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn drift(&self) -> u32 {
        self.config.drift
    }

    /// A fresh base32 shared secret for enrollment. The caller displays
    /// it (or its otpauth URI) and the user echoes it back with a first
    /// code to prove the authenticator was set up.
    pub fn create_secret(&self) -> String {
        encode_secret(&generate_secret(self.config.key_length))
    }

    /// Build the full spec for an account from an enrollment secret.
    pub fn create_spec(&self, secret_b32: &str, account_email: &str) -> Result<Totp, AuthError> {
        Totp::from_secret(secret_b32, &self.config.issuer, account_email)
            .map_err(|_| AuthError::CredentialRequirements("invalid totp secret".to_string()))
    }
}
