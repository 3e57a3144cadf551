//! Audit model - append-only per-account event trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Alert,
}

/// The subsystem a record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditModule {
    Account,
    Local,
    OAuth2,
    OneTime,
    Session,
}

impl AuditModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditModule::Account => "account",
            AuditModule::Local => "auth:local",
            AuditModule::OAuth2 => "auth:oauth2",
            AuditModule::OneTime => "auth:onetime",
            AuditModule::Session => "auth:session",
        }
    }
}

/// One audit entry. Never mutated or deleted after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub account_id: Uuid,
    pub module: AuditModule,
    pub level: AuditLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        account_id: Uuid,
        module: AuditModule,
        level: AuditLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            module,
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
