//! Stipulation model - typed conditions that gate full account access.
//!
//! A closed tagged union of specification variants, each carrying its own
//! satisfaction rule. Dispatch is on the tag; adding a variant means
//! extending the enum, not registering a reflective type.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The type tag of a stipulation specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StipulationKind {
    Token,
    Manual,
}

impl StipulationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StipulationKind::Token => "token",
            StipulationKind::Manual => "manual",
        }
    }
}

/// A stipulation specification. Satisfaction requires a provided spec of
/// the same kind that matches per the variant's own rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stipulation {
    /// Satisfied only by an exact code match (e.g. emailed verification
    /// codes).
    Token { code: String },
    /// Satisfied by any manual acknowledgement of the same kind
    /// (administrative holds cleared by an operator).
    Manual,
}

impl Stipulation {
    /// A token stipulation with a fresh random code.
    pub fn new_token() -> Self {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(18)
            .map(char::from)
            .collect();
        Stipulation::Token { code }
    }

    pub fn kind(&self) -> StipulationKind {
        match self {
            Stipulation::Token { .. } => StipulationKind::Token,
            Stipulation::Manual => StipulationKind::Manual,
        }
    }

    /// Whether `provided` satisfies this stored stipulation. Kinds must
    /// already agree; mismatched kinds never satisfy.
    pub fn is_satisfied_by(&self, provided: &Stipulation) -> bool {
        match (self, provided) {
            (Stipulation::Token { code }, Stipulation::Token { code: provided }) => {
                code == provided
            }
            (Stipulation::Manual, Stipulation::Manual) => true,
            _ => false,
        }
    }
}

/// A stipulation as persisted: serialized specification keyed by account
/// and kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStipulation {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: StipulationKind,
    pub spec: String,
    pub created_at: DateTime<Utc>,
}

impl StoredStipulation {
    pub fn new(account_id: Uuid, stipulation: &Stipulation) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            kind: stipulation.kind(),
            spec: serde_json::to_string(stipulation)?,
            created_at: Utc::now(),
        })
    }

    pub fn deserialize_spec(&self) -> Result<Stipulation, serde_json::Error> {
        serde_json::from_str(&self.spec)
    }
}
