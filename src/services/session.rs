//! Session service - signed session tokens, cookies, one-time sign-in.
//!
//! Sessions are stateless JWTs carrying the account id and the source of
//! authentication; revoking them early is out of scope, they simply
//! expire. One-time tokens are stateful and consumed through the store
//! so exactly one racing redemption wins.

use std::sync::Arc;

use chrono::{Duration, Utc};
use cookie::Cookie;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::{OneTimeConfig, SessionConfig, SigningMethod, MIN_SIGNING_SECRET_LEN};
use crate::models::{
    Account, AuditLevel, AuditModule, AuditRecord, OneTimeToken, SessionSource,
};
use crate::store::{Store, StoreError};

use super::email::{EmailMessage, EmailWorker};
use super::error::AuthError;
use super::record_audit;

/// Claims carried in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub sub: Uuid,
    pub aud: String,
    pub exp: i64,
    pub src: SessionSource,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    config: SessionConfig,
    one_time: OneTimeConfig,
    email: EmailWorker,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn Store>,
        config: SessionConfig,
        one_time: OneTimeConfig,
        email: EmailWorker,
    ) -> Self {
        Self {
            store,
            config,
            one_time,
            email,
        }
    }

    /// Sign a session token for an account. Refuses to sign with a
    /// symmetric secret shorter than the minimum, whatever the config
    /// validation said.
    pub async fn issue_session(
        &self,
        account_id: Uuid,
        source: SessionSource,
    ) -> Result<String, AuthError> {
        let jwt = &self.config.jwt;
        let claims = SessionClaims {
            iss: jwt.issuer.clone(),
            sub: account_id,
            aud: jwt.audience.clone(),
            exp: (Utc::now() + Duration::minutes(jwt.expires_minutes)).timestamp(),
            src: source,
        };

        let key = self.encoding_key()?;
        let token = encode(&Header::new(algorithm(jwt.method)), &claims, &key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("jwt encode: {e}")))?;

        info!(account_id = %account_id, source = %source, "session issued");
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Session,
                AuditLevel::Info,
                format!("session issued via {source}"),
            ),
        )
        .await;
        Ok(token)
    }

    /// Verify a session token's signature, issuer, audience, and expiry.
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let jwt = &self.config.jwt;
        let mut validation = Validation::new(algorithm(jwt.method));
        validation.set_issuer(&[&jwt.issuer]);
        validation.set_audience(&[&jwt.audience]);

        let key = self.decoding_key()?;
        match decode::<SessionClaims>(token, &key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                Err(AuthError::ExpiredToken)
            }
            Err(_) => Err(AuthError::InvalidToken),
        }
    }

    /// Build the session cookie for a signed token. Cookie lifetime
    /// always equals the token lifetime.
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        let cookie_cfg = &self.config.cookie;
        let mut builder = Cookie::build((cookie_cfg.name.clone(), token.to_string()))
            .path(cookie_cfg.path.clone())
            .http_only(cookie_cfg.http_only)
            .secure(cookie_cfg.secure)
            .max_age(cookie::time::Duration::minutes(
                self.config.jwt.expires_minutes,
            ));
        if let Some(domain) = &cookie_cfg.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    /// An expired cookie that clears the session client-side.
    pub fn clear_cookie(&self) -> Cookie<'static> {
        let cookie_cfg = &self.config.cookie;
        let mut builder = Cookie::build((cookie_cfg.name.clone(), String::new()))
            .path(cookie_cfg.path.clone())
            .http_only(cookie_cfg.http_only)
            .secure(cookie_cfg.secure)
            .max_age(cookie::time::Duration::ZERO);
        if let Some(domain) = &cookie_cfg.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    /// The cookie name sessions are carried under.
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie.name
    }

    /// Mint a one-time sign-in token and email it to the account. The
    /// token value is never returned through the main flow; tests and
    /// administrative callers get it from the return value.
    pub async fn issue_one_time_token(&self, account_id: Uuid) -> Result<OneTimeToken, AuthError> {
        let account = self.account(account_id).await?;
        if !account.active {
            return Err(AuthError::InactiveAccount);
        }

        let token = OneTimeToken::new(
            account_id,
            Duration::minutes(self.one_time.token_expires_minutes),
        );
        self.store.create_one_time_token(&token).await?;

        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::OneTime,
                AuditLevel::Info,
                "one-time token issued",
            ),
        )
        .await;
        self.email.submit(EmailMessage {
            to: account.email,
            subject: "Your one-time sign-in code".to_string(),
            body: format!(
                "Use this code to sign in. It expires in {} minutes and works once:\n\n{}\n",
                self.one_time.token_expires_minutes, token.value
            ),
        });
        Ok(token)
    }

    /// Redeem a one-time token. Consumption is atomic; expired and
    /// already-used tokens fail distinctly.
    pub async fn consume_one_time_token(&self, value: &str) -> Result<Account, AuthError> {
        let token = self.store.consume_one_time_token(value).await?;
        let account = self.account(token.account_id).await?;
        if !account.active {
            record_audit(
                self.store.as_ref(),
                AuditRecord::new(
                    account.id,
                    AuditModule::OneTime,
                    AuditLevel::Warn,
                    "one-time token redeemed for inactive account",
                ),
            )
            .await;
            return Err(AuthError::InactiveAccount);
        }

        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account.id,
                AuditModule::OneTime,
                AuditLevel::Info,
                "one-time token consumed",
            ),
        )
        .await;
        Ok(account)
    }

    fn encoding_key(&self) -> Result<EncodingKey, AuthError> {
        let jwt = &self.config.jwt;
        if jwt.method.is_symmetric() {
            if jwt.signing_key.len() < MIN_SIGNING_SECRET_LEN {
                return Err(AuthError::Internal(anyhow::anyhow!(
                    "refusing to sign with a secret shorter than {MIN_SIGNING_SECRET_LEN} bytes"
                )));
            }
            Ok(EncodingKey::from_secret(jwt.signing_key.as_bytes()))
        } else {
            EncodingKey::from_rsa_pem(jwt.signing_key.as_bytes())
                .map_err(|e| AuthError::Internal(anyhow::anyhow!("rsa private key: {e}")))
        }
    }

    fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        let jwt = &self.config.jwt;
        if jwt.method.is_symmetric() {
            Ok(DecodingKey::from_secret(jwt.signing_key.as_bytes()))
        } else {
            let pem = jwt
                .verification_key
                .as_deref()
                .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("missing rsa public key")))?;
            DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::Internal(anyhow::anyhow!("rsa public key: {e}")))
        }
    }

    async fn account(&self, account_id: Uuid) -> Result<Account, AuthError> {
        match self.store.find_account(account_id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(AuthError::AccountNotFound),
            Err(StoreError::Backend(e)) => Err(AuthError::Internal(e)),
            Err(e) => Err(AuthError::Internal(e.into())),
        }
    }
}

fn algorithm(method: SigningMethod) -> Algorithm {
    match method {
        SigningMethod::HS256 => Algorithm::HS256,
        SigningMethod::HS512 => Algorithm::HS512,
        SigningMethod::RS256 => Algorithm::RS256,
        SigningMethod::RS512 => Algorithm::RS512,
    }
}
