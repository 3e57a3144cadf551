//! Service error taxonomy.
//!
//! Every externally visible failure maps to one variant with a stable
//! kebab-case code; internal failures collapse into [`AuthError::Internal`]
//! so backend details never leak to callers.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account not found")]
    AccountNotFound,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account is inactive")]
    InactiveAccount,
    #[error("totp code required")]
    TotpMissing,
    #[error("totp code rejected")]
    TotpFailed,
    #[error("account has unsatisfied stipulations")]
    UnsatisfiedStipulations,
    #[error("stipulation not satisfied")]
    StipulationNotSatisfied,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("token already consumed")]
    ConsumedToken,
    #[error("requested scope not allowed")]
    InvalidScope,
    #[error("unknown client or bad client secret")]
    InvalidClient,
    #[error("grant type not allowed for this client")]
    GrantNotAllowed,
    #[error("unsupported grant type")]
    UnsupportedGrantType,
    #[error("username unavailable")]
    UsernameUnavailable,
    #[error("email already registered")]
    EmailExists,
    #[error("credential requirements not met: {0}")]
    CredentialRequirements(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable code for API surfaces and audit messages.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AccountNotFound => "account-not-found",
            AuthError::InvalidCredentials => "invalid-credentials",
            AuthError::InactiveAccount => "inactive-account",
            AuthError::TotpMissing => "totp-missing",
            AuthError::TotpFailed => "totp-failed",
            AuthError::UnsatisfiedStipulations => "unsatisfied-stipulations",
            AuthError::StipulationNotSatisfied => "stipulation-not-satisfied",
            AuthError::InvalidToken => "invalid-token",
            AuthError::ExpiredToken => "expired-token",
            AuthError::ConsumedToken => "consumed-token",
            AuthError::InvalidScope => "invalid-scope",
            AuthError::InvalidClient => "invalid-client",
            AuthError::GrantNotAllowed => "grant-not-allowed",
            AuthError::UnsupportedGrantType => "unsupported-grant-type",
            AuthError::UsernameUnavailable => "username-unavailable",
            AuthError::EmailExists => "email-exists",
            AuthError::CredentialRequirements(_) => "credential-requirements",
            AuthError::Internal(_) => "internal",
        }
    }
}

/// Default store-to-service mapping, tuned for token lookups. Callers
/// with different semantics (uniqueness conflicts, missing accounts)
/// match on [`StoreError`] themselves before falling back to this.
impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound | StoreError::Conflict => AuthError::InvalidToken,
            StoreError::AlreadyConsumed => AuthError::ConsumedToken,
            StoreError::Expired => AuthError::ExpiredToken,
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_token_failures() {
        assert_eq!(AuthError::from(StoreError::NotFound).code(), "invalid-token");
        assert_eq!(
            AuthError::from(StoreError::AlreadyConsumed).code(),
            "consumed-token"
        );
        assert_eq!(AuthError::from(StoreError::Expired).code(), "expired-token");
        assert_eq!(
            AuthError::from(StoreError::Backend(anyhow::anyhow!("db down"))).code(),
            "internal"
        );
    }
}
