//! In-memory store - reference implementation of the storage contract.
//!
//! All state lives behind a single mutex, so every contract method is
//! trivially atomic. Suitable for tests and embedded single-process use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Account, AuditRecord, Credential, OAuthToken, OneTimeToken, StipulationKind,
    StoredStipulation, TokenKind,
};

use super::{
    AccountStore, AuditStore, CredentialStore, OAuthTokenStore, OneTimeTokenStore, StipulationStore,
    StoreError,
};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    credentials: HashMap<Uuid, Credential>,
    oauth_tokens: HashMap<String, OAuthToken>,
    one_time_tokens: HashMap<String, OneTimeToken>,
    stipulations: Vec<StoredStipulation>,
    audits: Vec<AuditRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store lock poisoned")))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.accounts.contains_key(&account.id)
            || inner.accounts.values().any(|a| a.email == account.email)
        {
            return Err(StoreError::Conflict);
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> Result<Account, StoreError> {
        let inner = self.lock()?;
        inner.accounts.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let inner = self.lock()?;
        inner
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let account = inner.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.active = active;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.credentials.contains_key(&credential.account_id)
            || inner
                .credentials
                .values()
                .any(|c| c.username == credential.username)
        {
            return Err(StoreError::Conflict);
        }
        inner
            .credentials
            .insert(credential.account_id, credential.clone());
        Ok(())
    }

    async fn find_credential(&self, account_id: Uuid) -> Result<Credential, StoreError> {
        let inner = self.lock()?;
        inner
            .credentials
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_credential_by_username(&self, username: &str) -> Result<Credential, StoreError> {
        let inner = self.lock()?;
        inner
            .credentials
            .values()
            .find(|c| c.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_password(
        &self,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let credential = inner
            .credentials
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound)?;
        credential.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_totp(
        &self,
        account_id: Uuid,
        totp_spec: Option<String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let credential = inner
            .credentials
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound)?;
        credential.totp_spec = totp_spec;
        Ok(())
    }
}

#[async_trait]
impl OAuthTokenStore for MemoryStore {
    async fn create_oauth_token(&self, token: &OAuthToken) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.oauth_tokens.contains_key(&token.value) {
            return Err(StoreError::Conflict);
        }
        inner.oauth_tokens.insert(token.value.clone(), token.clone());
        Ok(())
    }

    async fn lookup_oauth_token(
        &self,
        client_id: &str,
        value: &str,
        kind: TokenKind,
        consume: bool,
    ) -> Result<OAuthToken, StoreError> {
        let mut inner = self.lock()?;
        let token = inner.oauth_tokens.get_mut(value).ok_or(StoreError::NotFound)?;
        if token.client_id != client_id || token.kind != kind {
            return Err(StoreError::NotFound);
        }
        if token.invalidated {
            return Err(StoreError::AlreadyConsumed);
        }
        if token.is_expired() {
            return Err(StoreError::Expired);
        }
        if consume {
            token.invalidated = true;
        }
        Ok(token.clone())
    }

    async fn find_bearer_token(&self, value: &str) -> Result<OAuthToken, StoreError> {
        let inner = self.lock()?;
        let token = inner.oauth_tokens.get(value).ok_or(StoreError::NotFound)?;
        if token.kind != TokenKind::AccessToken || token.invalidated {
            return Err(StoreError::NotFound);
        }
        if token.is_expired() {
            return Err(StoreError::Expired);
        }
        Ok(token.clone())
    }

    async fn live_tokens(
        &self,
        client_id: &str,
        account_id: Uuid,
    ) -> Result<Vec<OAuthToken>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .oauth_tokens
            .values()
            .filter(|t| t.client_id == client_id && t.account_id == account_id && t.is_live())
            .cloned()
            .collect())
    }

    async fn invalidate_token(&self, client_id: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let token = inner.oauth_tokens.get_mut(value).ok_or(StoreError::NotFound)?;
        if token.client_id != client_id {
            return Err(StoreError::NotFound);
        }
        token.invalidated = true;
        Ok(())
    }

    async fn invalidate_all(
        &self,
        client_id: &str,
        account_id: Uuid,
        kinds: Option<&[TokenKind]>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for token in inner.oauth_tokens.values_mut() {
            if token.client_id == client_id
                && token.account_id == account_id
                && kinds.map_or(true, |k| k.contains(&token.kind))
            {
                token.invalidated = true;
            }
        }
        Ok(())
    }

    async fn replace_tokens(
        &self,
        client_id: &str,
        account_id: Uuid,
        tokens: &[OAuthToken],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if tokens.iter().any(|t| inner.oauth_tokens.contains_key(&t.value)) {
            return Err(StoreError::Conflict);
        }
        for token in inner.oauth_tokens.values_mut() {
            if token.client_id == client_id && token.account_id == account_id {
                token.invalidated = true;
            }
        }
        for token in tokens {
            inner.oauth_tokens.insert(token.value.clone(), token.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl OneTimeTokenStore for MemoryStore {
    async fn create_one_time_token(&self, token: &OneTimeToken) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.one_time_tokens.contains_key(&token.value) {
            return Err(StoreError::Conflict);
        }
        inner
            .one_time_tokens
            .insert(token.value.clone(), token.clone());
        Ok(())
    }

    async fn consume_one_time_token(&self, value: &str) -> Result<OneTimeToken, StoreError> {
        let mut inner = self.lock()?;
        let token = inner
            .one_time_tokens
            .get_mut(value)
            .ok_or(StoreError::NotFound)?;
        if token.consumed {
            return Err(StoreError::AlreadyConsumed);
        }
        if token.is_expired() {
            return Err(StoreError::Expired);
        }
        token.consumed = true;
        Ok(token.clone())
    }
}

#[async_trait]
impl StipulationStore for MemoryStore {
    async fn add_stipulation(&self, stipulation: &StoredStipulation) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.stipulations.push(stipulation.clone());
        Ok(())
    }

    async fn stipulations_by_kind(
        &self,
        account_id: Uuid,
        kind: StipulationKind,
    ) -> Result<Vec<StoredStipulation>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .stipulations
            .iter()
            .filter(|s| s.account_id == account_id && s.kind == kind)
            .cloned()
            .collect())
    }

    async fn delete_stipulation(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.stipulations.len();
        inner.stipulations.retain(|s| s.id != id);
        Ok(inner.stipulations.len() < before)
    }

    async fn has_unsatisfied(&self, account_id: Uuid) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner.stipulations.iter().any(|s| s.account_id == account_id))
    }

    async fn delete_all_stipulations(&self, account_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.stipulations.retain(|s| s.account_id != account_id);
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.audits.push(record.clone());
        Ok(())
    }

    async fn audit_trail(&self, account_id: Uuid) -> Result<Vec<AuditRecord>, StoreError> {
        let inner = self.lock()?;
        let mut trail: Vec<AuditRecord> = inner
            .audits
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        trail.reverse();
        Ok(trail)
    }
}
