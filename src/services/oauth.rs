//! OAuth2 token service - per-client code, password, and refresh grants.
//!
//! Tokens are opaque values persisted through the store; nothing here is
//! self-describing, so revocation is immediate. Issuing a new token set
//! for a client/account pair invalidates the previous set in the same
//! store operation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;

use crate::config::{OAuthClientConfig, OAuthConfig, OAuthSettings};
use crate::dtos::GrantTokenRequest;
use crate::models::{
    AuditLevel, AuditModule, AuditRecord, OAuthToken, ScopeSet, TokenKind,
};
use crate::store::{Store, StoreError};

use super::error::AuthError;
use super::login::LocalLoginService;
use super::record_audit;

/// Refresh tokens do not expire in practice; they are revoked.
const REFRESH_TTL_DAYS: i64 = 365 * 100;

const CREATE_ATTEMPTS: usize = 3;

/// The result of a grant: an access token and, when the client is
/// configured for it, a refresh token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access: OAuthToken,
    pub refresh: Option<OAuthToken>,
}

/// Token service bound to one registered client.
#[derive(Clone)]
pub struct OAuthService {
    client_id: String,
    client: OAuthClientConfig,
    settings: OAuthSettings,
    store: Arc<dyn Store>,
}

impl OAuthService {
    pub fn new(
        client_id: &str,
        client: OAuthClientConfig,
        base_settings: &OAuthSettings,
        store: Arc<dyn Store>,
    ) -> Self {
        let settings = client.overrides.coalesce(base_settings);
        Self {
            client_id: client_id.to_string(),
            client,
            settings,
            store,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Constant-time client secret check.
    pub fn verify_secret(&self, provided: &str) -> bool {
        let expected = self.client.secret.as_bytes();
        let provided = provided.as_bytes();
        expected.len() == provided.len() && bool::from(expected.ct_eq(provided))
    }

    /// Requested scopes must be a subset of the client's allowlist.
    pub fn validate_scopes(&self, scopes: &ScopeSet) -> Result<(), AuthError> {
        let allowed = ScopeSet::from_names(&self.client.scopes);
        if allowed.contains_all(scopes) {
            Ok(())
        } else {
            Err(AuthError::InvalidScope)
        }
    }

    /// Redirect URIs match exactly; no prefix or wildcard rules.
    pub fn validate_redirect_uri(&self, redirect_uri: &str) -> Result<(), AuthError> {
        if self.client.redirect_uri == redirect_uri {
            Ok(())
        } else {
            Err(AuthError::InvalidClient)
        }
    }

    /// Mint a short-lived numeric authorization code for the account.
    pub async fn create_access_code(
        &self,
        account_id: Uuid,
        scopes: &ScopeSet,
    ) -> Result<OAuthToken, AuthError> {
        self.validate_scopes(scopes)?;
        let expires_at = Utc::now() + Duration::seconds(self.settings.code_expires_seconds);

        // numeric codes are short; retry the rare value collision
        for _ in 0..CREATE_ATTEMPTS {
            let code = OAuthToken::new(
                account_id,
                &self.client_id,
                TokenKind::Code,
                random_numeric_code(self.settings.code_length),
                scopes.clone(),
                expires_at,
            );
            match self.store.create_oauth_token(&code).await {
                Ok(()) => {
                    info!(client_id = %self.client_id, account_id = %account_id, "access code issued");
                    self.audit(account_id, AuditLevel::Info, "oauth2 access code issued")
                        .await;
                    return Ok(code);
                }
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::Internal(anyhow::anyhow!(
            "could not allocate a unique access code"
        )))
    }

    /// Authorization-code grant. The code is consumed atomically, so a
    /// replayed exchange fails even under racing requests.
    pub async fn trade_code_for_token(&self, code: &str) -> Result<IssuedToken, AuthError> {
        let code_token = match self
            .store
            .lookup_oauth_token(&self.client_id, code, TokenKind::Code, true)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                self.audit_anonymous_failure("oauth2 code exchange failed").await;
                return Err(e.into());
            }
        };

        let issued = self
            .issue_token(code_token.account_id, code_token.scopes.clone())
            .await?;
        self.audit(
            code_token.account_id,
            AuditLevel::Info,
            "oauth2 token issued via authorization_code",
        )
        .await;
        Ok(issued)
    }

    /// Resource-owner password grant, available only to clients with
    /// `allow_credentials` set.
    pub async fn trade_credentials_for_token(
        &self,
        login: &LocalLoginService,
        username: &str,
        password: &str,
        totp_code: Option<&str>,
        scopes: &ScopeSet,
    ) -> Result<IssuedToken, AuthError> {
        if !self.settings.allow_credentials {
            return Err(AuthError::GrantNotAllowed);
        }
        self.validate_scopes(scopes)?;

        let account = login.assert_login(username, password, totp_code).await?;
        let issued = self.issue_token(account.id, scopes.clone()).await?;
        self.audit(
            account.id,
            AuditLevel::Info,
            "oauth2 token issued via password grant",
        )
        .await;
        Ok(issued)
    }

    /// Refresh grant: mints a fresh access token with the refresh token's
    /// scopes. The refresh token itself is left in place, not rotated.
    pub async fn trade_refresh_for_token(&self, refresh: &str) -> Result<IssuedToken, AuthError> {
        let refresh_token = self
            .store
            .lookup_oauth_token(&self.client_id, refresh, TokenKind::RefreshToken, false)
            .await?;

        let access = OAuthToken::new(
            refresh_token.account_id,
            &self.client_id,
            TokenKind::AccessToken,
            random_token_value(),
            refresh_token.scopes.clone(),
            Utc::now() + Duration::seconds(self.settings.token_expires_seconds),
        );
        self.store.create_oauth_token(&access).await?;

        self.audit(
            refresh_token.account_id,
            AuditLevel::Info,
            "oauth2 token issued via refresh_token",
        )
        .await;
        Ok(IssuedToken {
            access,
            refresh: None,
        })
    }

    /// Issue a fresh token set for the account, invalidating any previous
    /// set in the same store operation. With `reuse_token` set, a live
    /// set whose scopes match exactly is returned instead.
    pub async fn issue_token(
        &self,
        account_id: Uuid,
        scopes: ScopeSet,
    ) -> Result<IssuedToken, AuthError> {
        if self.settings.reuse_token {
            if let Some(existing) = self.find_existing_token(account_id, &scopes).await? {
                return Ok(existing);
            }
        }

        let access = OAuthToken::new(
            account_id,
            &self.client_id,
            TokenKind::AccessToken,
            random_token_value(),
            scopes.clone(),
            Utc::now() + Duration::seconds(self.settings.token_expires_seconds),
        );
        let refresh = self.settings.issue_refresh_token.then(|| {
            OAuthToken::new(
                account_id,
                &self.client_id,
                TokenKind::RefreshToken,
                random_token_value(),
                scopes,
                Utc::now() + Duration::days(REFRESH_TTL_DAYS),
            )
        });

        let mut batch = vec![access.clone()];
        if let Some(refresh) = &refresh {
            batch.push(refresh.clone());
        }
        self.store
            .replace_tokens(&self.client_id, account_id, &batch)
            .await?;

        Ok(IssuedToken { access, refresh })
    }

    /// A live token set whose scopes match the request exactly. A client
    /// that issues refresh tokens only reuses a complete pair; a stray
    /// access token without its refresh token is not a reusable set.
    pub async fn find_existing_token(
        &self,
        account_id: Uuid,
        scopes: &ScopeSet,
    ) -> Result<Option<IssuedToken>, AuthError> {
        let live = self.store.live_tokens(&self.client_id, account_id).await?;
        let access = live
            .iter()
            .find(|t| t.kind == TokenKind::AccessToken && t.scopes.matches(scopes))
            .cloned();
        let Some(access) = access else {
            return Ok(None);
        };
        let refresh = live
            .iter()
            .find(|t| t.kind == TokenKind::RefreshToken && t.scopes.matches(scopes))
            .cloned();
        if self.settings.issue_refresh_token && refresh.is_none() {
            return Ok(None);
        }
        Ok(Some(IssuedToken { access, refresh }))
    }

    /// Look up a live access token without consuming it.
    pub async fn inspect_token(&self, value: &str) -> Result<OAuthToken, AuthError> {
        Ok(self
            .store
            .lookup_oauth_token(&self.client_id, value, TokenKind::AccessToken, false)
            .await?)
    }

    pub async fn invalidate_token(&self, value: &str) -> Result<(), AuthError> {
        Ok(self.store.invalidate_token(&self.client_id, value).await?)
    }

    /// Revoke every token this client holds for the account.
    pub async fn invalidate_all(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.store
            .invalidate_all(&self.client_id, account_id, None)
            .await?;
        self.audit(account_id, AuditLevel::Warn, "oauth2 tokens revoked")
            .await;
        Ok(())
    }

    async fn audit(&self, account_id: Uuid, level: AuditLevel, message: &str) {
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(account_id, AuditModule::OAuth2, level, message),
        )
        .await;
    }

    async fn audit_anonymous_failure(&self, message: &str) {
        // no account to pin the failure on; log only
        tracing::warn!(client_id = %self.client_id, "{message}");
    }
}

/// All configured clients, keyed by client id. The single entry point
/// for token grants.
#[derive(Clone)]
pub struct OAuthRegistry {
    clients: HashMap<String, OAuthService>,
}

impl OAuthRegistry {
    pub fn new(config: &OAuthConfig, store: Arc<dyn Store>) -> Self {
        let clients = config
            .clients
            .iter()
            .map(|(client_id, client)| {
                (
                    client_id.clone(),
                    OAuthService::new(client_id, client.clone(), &config.settings, store.clone()),
                )
            })
            .collect();
        Self { clients }
    }

    pub fn client(&self, client_id: &str) -> Option<&OAuthService> {
        self.clients.get(client_id)
    }

    /// Authenticate the client and dispatch one token endpoint request.
    pub async fn grant(
        &self,
        login: &LocalLoginService,
        request: &GrantTokenRequest,
    ) -> Result<IssuedToken, AuthError> {
        let client = self
            .client(&request.client_id)
            .ok_or(AuthError::InvalidClient)?;
        if !client.verify_secret(&request.client_secret) {
            return Err(AuthError::InvalidClient);
        }

        match request.grant_type.as_str() {
            "authorization_code" => {
                // the redirect must match the registration at exchange
                // time, not just when the code was minted
                let redirect_uri = request
                    .redirect_uri
                    .as_deref()
                    .ok_or(AuthError::InvalidClient)?;
                client.validate_redirect_uri(redirect_uri)?;
                let code = request.code.as_deref().ok_or(AuthError::InvalidToken)?;
                client.trade_code_for_token(code).await
            }
            "password" => {
                let username = request
                    .username
                    .as_deref()
                    .ok_or(AuthError::InvalidCredentials)?;
                let password = request
                    .password
                    .as_deref()
                    .ok_or(AuthError::InvalidCredentials)?;
                let scopes = ScopeSet::parse(request.scope.as_deref().unwrap_or_default());
                client
                    .trade_credentials_for_token(
                        login,
                        username,
                        password,
                        request.totp.as_deref(),
                        &scopes,
                    )
                    .await
            }
            "refresh_token" => {
                let refresh = request
                    .refresh_token
                    .as_deref()
                    .ok_or(AuthError::InvalidToken)?;
                client.trade_refresh_for_token(refresh).await
            }
            _ => Err(AuthError::UnsupportedGrantType),
        }
    }
}

fn random_numeric_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len.max(1))
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn random_token_value() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
