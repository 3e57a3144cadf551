//! Local login service - username/password with optional TOTP.
//!
//! `assert_login` checks run in a fixed order: credential lookup, account
//! active flag, password, stipulations, then the TOTP second factor. A
//! stipulation hold is reported only after the password has verified, so
//! it never leaks whether a password was correct for a held account to
//! a caller who failed the password check.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::CredentialRequirements;
use crate::models::{
    Account, AuditLevel, AuditModule, AuditRecord, Credential, Stipulation, StoredStipulation,
};
use crate::store::{Store, StoreError};
use crate::utils::{hash_password, Password};

use super::email::{EmailMessage, EmailWorker};
use super::error::AuthError;
use super::record_audit;
use super::two_factor::TwoFactorService;

#[derive(Clone)]
pub struct LocalLoginService {
    store: Arc<dyn Store>,
    requirements: CredentialRequirements,
    two_factor: TwoFactorService,
    email: EmailWorker,
}

impl LocalLoginService {
    pub fn new(
        store: Arc<dyn Store>,
        requirements: CredentialRequirements,
        two_factor: TwoFactorService,
        email: EmailWorker,
    ) -> Self {
        Self {
            store,
            requirements,
            two_factor,
            email,
        }
    }

    /// Create the local credential for an account. Usernames are unique
    /// and immutable once set.
    pub async fn create_credential(
        &self,
        account_id: Uuid,
        username: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        let username = username.trim().to_lowercase();
        self.validate_username(&username)?;
        self.validate_password(password)?;

        let hash = hash_password(&Password::new(password.to_string()))?;
        let credential = Credential::new(account_id, &username, hash);
        match self.store.create_credential(&credential).await {
            Ok(()) => {}
            Err(StoreError::Conflict) => return Err(AuthError::UsernameUnavailable),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        }

        info!(account_id = %account_id, "local credential created");
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Local,
                AuditLevel::Info,
                "local credential created",
            ),
        )
        .await;

        if self.requirements.email_validation_required {
            self.require_email_validation(account_id).await?;
        }
        Ok(credential)
    }

    /// Attach a token stipulation holding the account until the emailed
    /// verification code is satisfied. Delivery is best effort; the
    /// stipulation is in place regardless.
    async fn require_email_validation(&self, account_id: Uuid) -> Result<(), AuthError> {
        let account = match self.store.find_account(account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::AccountNotFound),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        };

        let stipulation = Stipulation::new_token();
        let stored = StoredStipulation::new(account_id, &stipulation)
            .map_err(|e| AuthError::Internal(e.into()))?;
        self.store
            .add_stipulation(&stored)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Local,
                AuditLevel::Info,
                "email validation required",
            ),
        )
        .await;

        if let Stipulation::Token { code } = &stipulation {
            self.email.submit(EmailMessage {
                to: account.email,
                subject: "Verify your email address".to_string(),
                body: format!(
                    "Enter this code to verify your email address:\n\n{code}\n"
                ),
            });
        }
        Ok(())
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        match self
            .store
            .find_credential_by_username(&username.trim().to_lowercase())
            .await
        {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(StoreError::Backend(e)) => Err(AuthError::Internal(e)),
            Err(e) => Err(AuthError::Internal(e.into())),
        }
    }

    /// Authenticate a username (or email) and password, plus a TOTP code
    /// when the credential has one enrolled.
    pub async fn assert_login(
        &self,
        username: &str,
        password: &str,
        totp_code: Option<&str>,
    ) -> Result<Account, AuthError> {
        let credential = self.resolve_credential(username).await?;
        let account = match self.store.find_account(credential.account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        };

        if !account.active {
            self.audit_failure(account.id, "login rejected: inactive account")
                .await;
            return Err(AuthError::InactiveAccount);
        }

        if !credential.verify_password(password) {
            self.audit_failure(account.id, "login failed: bad password")
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        let unsatisfied = self
            .store
            .has_unsatisfied(account.id)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;
        if unsatisfied {
            self.audit_failure(account.id, "login held: unsatisfied stipulations")
                .await;
            return Err(AuthError::UnsatisfiedStipulations);
        }

        if self.two_factor.enabled() && credential.has_totp() {
            let Some(code) = totp_code else {
                return Err(AuthError::TotpMissing);
            };
            if !credential.verify_totp(code, self.two_factor.drift()) {
                self.audit_failure(account.id, "login failed: bad totp code")
                    .await;
                return Err(AuthError::TotpFailed);
            }
        }

        info!(account_id = %account.id, "login succeeded");
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account.id,
                AuditModule::Local,
                AuditLevel::Info,
                "login succeeded",
            ),
        )
        .await;
        Ok(account)
    }

    /// Change a password after verifying the old one.
    pub async fn update_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let credential = self.credential_for(account_id).await?;
        if !credential.verify_password(old_password) {
            self.audit_failure(account_id, "password change failed: bad old password")
                .await;
            return Err(AuthError::InvalidCredentials);
        }
        self.set_password(account_id, new_password).await
    }

    /// Change a password without the old one. Reserved for callers that
    /// already proved identity another way (a consumed one-time token).
    pub async fn update_password_unsafe(
        &self,
        account_id: Uuid,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.credential_for(account_id).await?;
        self.set_password(account_id, new_password).await
    }

    /// Enroll TOTP. The caller provides the secret previously issued by
    /// [`TwoFactorService::create_secret`] and a current code, proving
    /// the authenticator holds the secret before anything is stored.
    pub async fn activate_totp(
        &self,
        account_id: Uuid,
        secret_b32: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        if !self.two_factor.enabled() {
            return Err(AuthError::TotpFailed);
        }
        let account = match self.store.find_account(account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::AccountNotFound),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        };
        self.credential_for(account_id).await?;

        let spec = self.two_factor.create_spec(secret_b32, &account.email)?;
        if !spec.validate(code, self.two_factor.drift()) {
            return Err(AuthError::TotpFailed);
        }
        let uri = spec
            .uri()
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("totp uri: {e}")))?;
        self.store
            .update_totp(account_id, Some(uri))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Local,
                AuditLevel::Info,
                "totp enrolled",
            ),
        )
        .await;
        Ok(())
    }

    /// Remove the TOTP enrollment after verifying a current code.
    pub async fn deactivate_totp(&self, account_id: Uuid, code: &str) -> Result<(), AuthError> {
        let credential = self.credential_for(account_id).await?;
        if !credential.has_totp() {
            return Ok(());
        }
        if !credential.verify_totp(code, self.two_factor.drift()) {
            self.audit_failure(account_id, "totp removal failed: bad code")
                .await;
            return Err(AuthError::TotpFailed);
        }
        self.store
            .update_totp(account_id, None)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Local,
                AuditLevel::Warn,
                "totp removed",
            ),
        )
        .await;
        Ok(())
    }

    async fn set_password(&self, account_id: Uuid, new_password: &str) -> Result<(), AuthError> {
        self.validate_password(new_password)?;
        let hash = hash_password(&Password::new(new_password.to_string()))?;
        self.store
            .update_password(account_id, hash.as_str())
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Local,
                AuditLevel::Info,
                "password changed",
            ),
        )
        .await;
        Ok(())
    }

    /// Look up by username first and fall back to the account email, so
    /// users can log in with either.
    async fn resolve_credential(&self, username: &str) -> Result<Credential, AuthError> {
        let username = username.trim().to_lowercase();
        match self.store.find_credential_by_username(&username).await {
            Ok(credential) => return Ok(credential),
            Err(StoreError::NotFound) => {}
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        }

        let account = match self.store.find_account_by_email(&username).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
            Err(e) => return Err(AuthError::Internal(e.into())),
        };
        match self.store.find_credential(account.id).await {
            Ok(credential) => Ok(credential),
            Err(StoreError::NotFound) => Err(AuthError::InvalidCredentials),
            Err(StoreError::Backend(e)) => Err(AuthError::Internal(e)),
            Err(e) => Err(AuthError::Internal(e.into())),
        }
    }

    async fn credential_for(&self, account_id: Uuid) -> Result<Credential, AuthError> {
        match self.store.find_credential(account_id).await {
            Ok(credential) => Ok(credential),
            Err(StoreError::NotFound) => Err(AuthError::InvalidCredentials),
            Err(StoreError::Backend(e)) => Err(AuthError::Internal(e)),
            Err(e) => Err(AuthError::Internal(e.into())),
        }
    }

    async fn audit_failure(&self, account_id: Uuid, message: &str) {
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(account_id, AuditModule::Local, AuditLevel::Warn, message),
        )
        .await;
    }

    fn validate_username(&self, username: &str) -> Result<(), AuthError> {
        let len = username.chars().count();
        if len < self.requirements.username_min_length
            || len > self.requirements.username_max_length
        {
            return Err(AuthError::CredentialRequirements(format!(
                "username must be {} to {} characters",
                self.requirements.username_min_length, self.requirements.username_max_length
            )));
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        let len = password.chars().count();
        if len < self.requirements.password_min_length
            || len > self.requirements.password_max_length
        {
            return Err(AuthError::CredentialRequirements(format!(
                "password must be {} to {} characters",
                self.requirements.password_min_length, self.requirements.password_max_length
            )));
        }
        Ok(())
    }
}
