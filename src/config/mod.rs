//! Configuration structs for the identity core.
//!
//! Every component takes its configuration explicitly through its
//! constructor; there is no ambient global config. Loading these structs
//! from a file or the environment is the host application's concern.

use serde::Deserialize;
use std::collections::HashMap;

/// Top-level configuration for the core.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub requirements: CredentialRequirements,
    pub totp: TotpConfig,
    pub session: SessionConfig,
    pub one_time: OneTimeConfig,
    pub oauth: OAuthConfig,
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.requirements.validate()?;
        self.session.jwt.validate()?;
        for (client_id, client) in &self.oauth.clients {
            if client.secret.is_empty() {
                return Err(format!("oauth client {client_id} has an empty secret"));
            }
        }
        Ok(())
    }
}

/// Length bounds for usernames and passwords. No strength scoring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialRequirements {
    pub username_min_length: usize,
    pub username_max_length: usize,
    pub password_min_length: usize,
    pub password_max_length: usize,
    /// Gate new credentials behind an emailed verification code; the
    /// account cannot complete a login until the code is satisfied.
    pub email_validation_required: bool,
}

impl Default for CredentialRequirements {
    fn default() -> Self {
        Self {
            username_min_length: 3,
            username_max_length: 64,
            password_min_length: 8,
            password_max_length: 256,
            email_validation_required: false,
        }
    }
}

impl CredentialRequirements {
    fn validate(&self) -> Result<(), String> {
        if self.username_min_length > self.username_max_length {
            return Err("username length bounds are inverted".into());
        }
        if self.password_min_length > self.password_max_length {
            return Err("password length bounds are inverted".into());
        }
        Ok(())
    }
}

/// TOTP second-factor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TotpConfig {
    pub enabled: bool,
    /// Issuer embedded in otpauth URIs shown to the user.
    pub issuer: String,
    /// Shared-secret length in bytes.
    pub key_length: usize,
    /// Accepted clock drift, in 30-second steps.
    pub drift: u32,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            issuer: "portcullis".to_string(),
            key_length: 20,
            drift: 2,
        }
    }
}

/// Signing algorithm for session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SigningMethod {
    HS256,
    HS512,
    RS256,
    RS512,
}

impl SigningMethod {
    pub fn is_symmetric(self) -> bool {
        matches!(self, SigningMethod::HS256 | SigningMethod::HS512)
    }
}

/// Symmetric secrets shorter than this are refused outright.
pub const MIN_SIGNING_SECRET_LEN: usize = 8;

/// Session JWT signing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionJwtConfig {
    pub method: SigningMethod,
    /// Shared secret (HS*) or PEM-encoded private key (RS*).
    pub signing_key: String,
    /// PEM-encoded public key; required for RS*, ignored for HS*.
    #[serde(default)]
    pub verification_key: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub expires_minutes: i64,
}

impl Default for SessionJwtConfig {
    fn default() -> Self {
        Self {
            method: SigningMethod::HS256,
            signing_key: String::new(),
            verification_key: None,
            issuer: "portcullis".to_string(),
            audience: "portcullis".to_string(),
            expires_minutes: 30,
        }
    }
}

impl SessionJwtConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.method.is_symmetric() {
            if self.signing_key.len() < MIN_SIGNING_SECRET_LEN {
                return Err(format!(
                    "session signing secret must be at least {MIN_SIGNING_SECRET_LEN} bytes"
                ));
            }
        } else if self.signing_key.is_empty() || self.verification_key.is_none() {
            return Err("asymmetric signing requires both private and public PEM keys".into());
        }
        if self.expires_minutes <= 0 {
            return Err("session expiry must be positive".into());
        }
        Ok(())
    }
}

/// Session cookie attributes. Expiry always matches the token TTL.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "auth".to_string(),
            domain: None,
            path: "/".to_string(),
            http_only: true,
            secure: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub jwt: SessionJwtConfig,
    pub cookie: CookieConfig,
}

/// One-time (passwordless recovery) token settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OneTimeConfig {
    pub token_expires_minutes: i64,
}

impl Default for OneTimeConfig {
    fn default() -> Self {
        Self {
            token_expires_minutes: 30,
        }
    }
}

/// OAuth2 settings shared by all clients unless overridden per client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub issuer: String,
    /// Digits in an authorization code.
    pub code_length: usize,
    pub code_expires_seconds: i64,
    pub token_expires_seconds: i64,
    pub issue_refresh_token: bool,
    /// Return an existing live token when its scope set matches exactly.
    pub reuse_token: bool,
    /// Allow the password grant for this client.
    pub allow_credentials: bool,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            issuer: "portcullis".to_string(),
            code_length: 6,
            code_expires_seconds: 60,
            token_expires_seconds: 12 * 60 * 60,
            issue_refresh_token: false,
            reuse_token: false,
            allow_credentials: false,
        }
    }
}

/// Per-client overrides of [`OAuthSettings`]; unset fields inherit.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OAuthSettingsOverride {
    pub code_expires_seconds: Option<i64>,
    pub token_expires_seconds: Option<i64>,
    pub issue_refresh_token: Option<bool>,
    pub reuse_token: Option<bool>,
    pub allow_credentials: Option<bool>,
}

impl OAuthSettingsOverride {
    pub fn coalesce(&self, base: &OAuthSettings) -> OAuthSettings {
        OAuthSettings {
            issuer: base.issuer.clone(),
            code_length: base.code_length,
            code_expires_seconds: self.code_expires_seconds.unwrap_or(base.code_expires_seconds),
            token_expires_seconds: self
                .token_expires_seconds
                .unwrap_or(base.token_expires_seconds),
            issue_refresh_token: self.issue_refresh_token.unwrap_or(base.issue_refresh_token),
            reuse_token: self.reuse_token.unwrap_or(base.reuse_token),
            allow_credentials: self.allow_credentials.unwrap_or(base.allow_credentials),
        }
    }
}

/// A registered OAuth2 client.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientConfig {
    #[serde(default)]
    pub name: String,
    pub secret: String,
    pub redirect_uri: String,
    /// Scope allowlist; requested scopes must be a subset.
    pub scopes: Vec<String>,
    #[serde(default)]
    pub overrides: OAuthSettingsOverride,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OAuthConfig {
    pub settings: OAuthSettings,
    pub clients: HashMap<String, OAuthClientConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_inherit_unset_fields() {
        let base = OAuthSettings {
            token_expires_seconds: 600,
            reuse_token: true,
            ..Default::default()
        };
        let overrides = OAuthSettingsOverride {
            reuse_token: Some(false),
            ..Default::default()
        };
        let merged = overrides.coalesce(&base);
        assert_eq!(merged.token_expires_seconds, 600);
        assert!(!merged.reuse_token);
        assert!(!merged.allow_credentials);
    }

    #[test]
    fn core_config_rejects_clients_without_secrets() {
        let mut config = CoreConfig::default();
        config.session.jwt.signing_key = "a-long-enough-secret".to_string();
        assert!(config.validate().is_ok());

        config.oauth.clients.insert(
            "app".to_string(),
            OAuthClientConfig {
                name: "App".to_string(),
                secret: String::new(),
                redirect_uri: "https://app.example.com/cb".to_string(),
                scopes: vec!["email".to_string()],
                overrides: OAuthSettingsOverride::default(),
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_symmetric_secret_is_rejected() {
        let cfg = SessionJwtConfig {
            signing_key: "short".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SessionJwtConfig {
            signing_key: "long-enough-secret".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
