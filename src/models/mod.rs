pub mod account;
pub mod audit;
pub mod credential;
pub mod oauth_token;
pub mod one_time_token;
pub mod scope;
pub mod source;
pub mod stipulation;

pub use account::Account;
pub use audit::{AuditLevel, AuditModule, AuditRecord};
pub use credential::Credential;
pub use oauth_token::{OAuthToken, TokenKind};
pub use one_time_token::OneTimeToken;
pub use scope::ScopeSet;
pub use source::SessionSource;
pub use stipulation::{Stipulation, StipulationKind, StoredStipulation};
