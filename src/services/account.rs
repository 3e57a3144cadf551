//! Account service - lifecycle of the root identity record.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::{Account, AuditLevel, AuditModule, AuditRecord};
use crate::store::{Store, StoreError};

use super::error::AuthError;
use super::record_audit;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create an active account. Emails are unique; a duplicate reports
    /// [`AuthError::EmailExists`].
    pub async fn create_account(&self, email: &str) -> Result<Account, AuthError> {
        let account = Account::new(email);
        match self.store.create_account(&account).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => return Err(AuthError::EmailExists),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        }

        info!(account_id = %account.id, "account created");
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account.id,
                AuditModule::Account,
                AuditLevel::Info,
                "account created",
            ),
        )
        .await;
        Ok(account)
    }

    pub async fn find_account(&self, id: Uuid) -> Result<Account, AuthError> {
        match self.store.find_account(id).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(AuthError::AccountNotFound),
            Err(StoreError::Backend(e)) => Err(AuthError::Internal(e)),
            Err(e) => Err(AuthError::Internal(e.into())),
        }
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Account, AuthError> {
        match self
            .store
            .find_account_by_email(&email.trim().to_lowercase())
            .await
        {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(AuthError::AccountNotFound),
            Err(StoreError::Backend(e)) => Err(AuthError::Internal(e)),
            Err(e) => Err(AuthError::Internal(e.into())),
        }
    }

    /// Activate or deactivate an account. Deactivation takes effect on
    /// the next authentication attempt; existing sessions expire on
    /// their own.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<(), AuthError> {
        match self.store.set_account_active(id, active).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(AuthError::AccountNotFound),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        }

        let (level, message) = if active {
            (AuditLevel::Info, "account activated")
        } else {
            (AuditLevel::Warn, "account deactivated")
        };
        info!(account_id = %id, active, "account active flag changed");
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(id, AuditModule::Account, level, message),
        )
        .await;
        Ok(())
    }

    /// The account's audit trail, newest first.
    pub async fn audit_trail(&self, id: Uuid) -> Result<Vec<AuditRecord>, AuthError> {
        self.store
            .audit_trail(id)
            .await
            .map_err(|e| AuthError::Internal(e.into()))
    }
}
