//! Stipulation service - conditions that must clear before full access.
//!
//! Satisfaction scans the account's stored stipulations of the provided
//! kind and deletes the first match. The delete is the serialization
//! point: when two callers race on the same stipulation the store lets
//! exactly one delete succeed, and the loser keeps scanning.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::{AuditLevel, AuditModule, AuditRecord, Stipulation, StoredStipulation};
use crate::store::Store;

use super::error::AuthError;
use super::record_audit;

#[derive(Clone)]
pub struct StipulationService {
    store: Arc<dyn Store>,
}

impl StipulationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Attach a stipulation to an account. Until every stipulation is
    /// satisfied the account cannot complete a login.
    pub async fn add(
        &self,
        account_id: Uuid,
        stipulation: &Stipulation,
    ) -> Result<StoredStipulation, AuthError> {
        let stored = StoredStipulation::new(account_id, stipulation)
            .map_err(|e| AuthError::Internal(e.into()))?;
        self.store
            .add_stipulation(&stored)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;
        info!(account_id = %account_id, kind = stipulation.kind().as_str(), "stipulation added");
        Ok(stored)
    }

    /// Satisfy one stipulation with the provided specification. Both the
    /// success and the failure are audited.
    pub async fn satisfy(
        &self,
        account_id: Uuid,
        provided: &Stipulation,
    ) -> Result<(), AuthError> {
        let candidates = self
            .store
            .stipulations_by_kind(account_id, provided.kind())
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        for candidate in candidates {
            let stored = match candidate.deserialize_spec() {
                Ok(spec) => spec,
                Err(_) => continue,
            };
            if !stored.is_satisfied_by(provided) {
                continue;
            }
            let won = self
                .store
                .delete_stipulation(candidate.id)
                .await
                .map_err(|e| AuthError::Internal(e.into()))?;
            if won {
                record_audit(
                    self.store.as_ref(),
                    AuditRecord::new(
                        account_id,
                        AuditModule::Account,
                        AuditLevel::Info,
                        format!("stipulation satisfied: {}", provided.kind().as_str()),
                    ),
                )
                .await;
                return Ok(());
            }
        }

        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Account,
                AuditLevel::Warn,
                format!(
                    "stipulation satisfaction failed: {}",
                    provided.kind().as_str()
                ),
            ),
        )
        .await;
        Err(AuthError::StipulationNotSatisfied)
    }

    pub async fn has_unsatisfied(&self, account_id: Uuid) -> Result<bool, AuthError> {
        self.store
            .has_unsatisfied(account_id)
            .await
            .map_err(|e| AuthError::Internal(e.into()))
    }

    /// Administrative override: clear every stipulation at once.
    pub async fn force_satisfy_all(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.store
            .delete_all_stipulations(account_id)
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;
        record_audit(
            self.store.as_ref(),
            AuditRecord::new(
                account_id,
                AuditModule::Account,
                AuditLevel::Warn,
                "all stipulations force-satisfied",
            ),
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (StipulationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (StipulationService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn token_stipulation_requires_matching_code() {
        let (svc, _) = service();
        let account_id = Uuid::new_v4();
        let stipulation = Stipulation::new_token();
        svc.add(account_id, &stipulation).await.unwrap();
        assert!(svc.has_unsatisfied(account_id).await.unwrap());

        let wrong = Stipulation::Token {
            code: "nope".to_string(),
        };
        assert!(matches!(
            svc.satisfy(account_id, &wrong).await,
            Err(AuthError::StipulationNotSatisfied)
        ));
        assert!(svc.has_unsatisfied(account_id).await.unwrap());

        svc.satisfy(account_id, &stipulation).await.unwrap();
        assert!(!svc.has_unsatisfied(account_id).await.unwrap());
    }

    #[tokio::test]
    async fn satisfied_stipulation_cannot_be_satisfied_again() {
        let (svc, _) = service();
        let account_id = Uuid::new_v4();
        let stipulation = Stipulation::new_token();
        svc.add(account_id, &stipulation).await.unwrap();

        svc.satisfy(account_id, &stipulation).await.unwrap();
        assert!(matches!(
            svc.satisfy(account_id, &stipulation).await,
            Err(AuthError::StipulationNotSatisfied)
        ));
    }

    #[tokio::test]
    async fn manual_satisfaction_clears_a_manual_hold() {
        let (svc, _) = service();
        let account_id = Uuid::new_v4();
        svc.add(account_id, &Stipulation::Manual).await.unwrap();

        // a token cannot clear a manual hold
        assert!(matches!(
            svc.satisfy(account_id, &Stipulation::new_token()).await,
            Err(AuthError::StipulationNotSatisfied)
        ));
        svc.satisfy(account_id, &Stipulation::Manual).await.unwrap();
    }

    #[tokio::test]
    async fn force_satisfy_clears_everything() {
        let (svc, _) = service();
        let account_id = Uuid::new_v4();
        svc.add(account_id, &Stipulation::new_token()).await.unwrap();
        svc.add(account_id, &Stipulation::Manual).await.unwrap();

        svc.force_satisfy_all(account_id).await.unwrap();
        assert!(!svc.has_unsatisfied(account_id).await.unwrap());
    }

    #[tokio::test]
    async fn outcomes_are_audited() {
        let (svc, store) = service();
        let account_id = Uuid::new_v4();
        let stipulation = Stipulation::new_token();
        svc.add(account_id, &stipulation).await.unwrap();

        let _ = svc
            .satisfy(
                account_id,
                &Stipulation::Token {
                    code: "bad".to_string(),
                },
            )
            .await;
        svc.satisfy(account_id, &stipulation).await.unwrap();

        let trail = crate::store::AuditStore::audit_trail(store.as_ref(), account_id)
            .await
            .unwrap();
        assert!(trail.iter().any(|r| r.message.starts_with("stipulation satisfied")));
        assert!(trail
            .iter()
            .any(|r| r.message.starts_with("stipulation satisfaction failed")));
    }
}
