//! Storage contract - the traits a backing store must implement.
//!
//! Every method that transitions state (consuming a token, satisfying a
//! stipulation, replacing a client's tokens) must be atomic with respect
//! to concurrent callers: under racing requests exactly one caller wins
//! and the others observe the post-transition state. [`MemoryStore`]
//! provides a reference implementation; production hosts plug in their
//! own database-backed store.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, AuditRecord, Credential, OAuthToken, OneTimeToken, StipulationKind,
    StoredStipulation, TokenKind,
};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("token already consumed")]
    AlreadyConsumed,
    #[error("token expired")]
    Expired,
    #[error("record already exists")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Persist a new account. Fails with [`StoreError::Conflict`] when the
    /// id or email is already taken.
    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_account(&self, id: Uuid) -> Result<Account, StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError>;

    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a credential. Fails with [`StoreError::Conflict`] when the
    /// account already has one or the username is taken.
    async fn create_credential(&self, credential: &Credential) -> Result<(), StoreError>;

    async fn find_credential(&self, account_id: Uuid) -> Result<Credential, StoreError>;

    async fn find_credential_by_username(&self, username: &str) -> Result<Credential, StoreError>;

    async fn update_password(&self, account_id: Uuid, password_hash: &str)
        -> Result<(), StoreError>;

    /// Set or clear the stored TOTP spec.
    async fn update_totp(
        &self,
        account_id: Uuid,
        totp_spec: Option<String>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OAuthTokenStore: Send + Sync {
    /// Persist a token. Token values are unique across every kind.
    async fn create_oauth_token(&self, token: &OAuthToken) -> Result<(), StoreError>;

    /// Look up a live token by client, value, and kind. With `consume`
    /// set the lookup atomically invalidates the token, so under racing
    /// callers exactly one receives it. Invalidated tokens report
    /// [`StoreError::AlreadyConsumed`], expired ones [`StoreError::Expired`].
    async fn lookup_oauth_token(
        &self,
        client_id: &str,
        value: &str,
        kind: TokenKind,
        consume: bool,
    ) -> Result<OAuthToken, StoreError>;

    /// Look up a live access token by value alone, for bearer
    /// authentication where the client is not known up front.
    async fn find_bearer_token(&self, value: &str) -> Result<OAuthToken, StoreError>;

    /// All live tokens for a client/account pair.
    async fn live_tokens(
        &self,
        client_id: &str,
        account_id: Uuid,
    ) -> Result<Vec<OAuthToken>, StoreError>;

    async fn invalidate_token(&self, client_id: &str, value: &str) -> Result<(), StoreError>;

    /// Invalidate every live token for the client/account pair, or only
    /// the given kinds when `kinds` is set.
    async fn invalidate_all(
        &self,
        client_id: &str,
        account_id: Uuid,
        kinds: Option<&[TokenKind]>,
    ) -> Result<(), StoreError>;

    /// Atomically invalidate all live tokens for the client/account pair
    /// and persist `tokens` in their place. No interleaving caller may
    /// observe both an old and a new token as live.
    async fn replace_tokens(
        &self,
        client_id: &str,
        account_id: Uuid,
        tokens: &[OAuthToken],
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OneTimeTokenStore: Send + Sync {
    async fn create_one_time_token(&self, token: &OneTimeToken) -> Result<(), StoreError>;

    /// Atomically consume a token by value. Exactly one racing caller
    /// succeeds; the rest see [`StoreError::AlreadyConsumed`]. Expired
    /// tokens report [`StoreError::Expired`] without being consumed.
    async fn consume_one_time_token(&self, value: &str) -> Result<OneTimeToken, StoreError>;
}

#[async_trait]
pub trait StipulationStore: Send + Sync {
    async fn add_stipulation(&self, stipulation: &StoredStipulation) -> Result<(), StoreError>;

    async fn stipulations_by_kind(
        &self,
        account_id: Uuid,
        kind: StipulationKind,
    ) -> Result<Vec<StoredStipulation>, StoreError>;

    /// Delete a stipulation by id, returning whether this call removed
    /// it. Racing satisfiers serialize here: only one caller gets `true`.
    async fn delete_stipulation(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn has_unsatisfied(&self, account_id: Uuid) -> Result<bool, StoreError>;

    async fn delete_all_stipulations(&self, account_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// The account's audit trail, newest first.
    async fn audit_trail(&self, account_id: Uuid) -> Result<Vec<AuditRecord>, StoreError>;
}

/// The full storage surface the services are built against.
pub trait Store:
    AccountStore + CredentialStore + OAuthTokenStore + OneTimeTokenStore + StipulationStore + AuditStore
{
}

impl<T> Store for T where
    T: AccountStore
        + CredentialStore
        + OAuthTokenStore
        + OneTimeTokenStore
        + StipulationStore
        + AuditStore
{
}
