//! Embeddable identity and authorization core.
//!
//! Authenticates end users by local credential (with optional TOTP second
//! factor) or delegated token, issues verifiable session and OAuth2 bearer
//! tokens, and enforces account-level stipulations before access is
//! granted. Persistence, HTTP routing, and email transport are supplied by
//! the host application through the traits in [`store`] and
//! [`services::email`].

pub mod config;
pub mod dtos;
pub mod models;
pub mod selector;
pub mod services;
pub mod store;
pub mod totp;
pub mod utils;

pub use models::{
    Account, AuditLevel, AuditModule, AuditRecord, Credential, OAuthToken, OneTimeToken, ScopeSet,
    SessionSource, Stipulation, StipulationKind, TokenKind,
};
pub use services::{
    AccountService, AuthError, EmailProvider, EmailWorker, IssuedToken, LocalLoginService,
    OAuthRegistry, OAuthService, SessionClaims, SessionService, StipulationService,
    TwoFactorService,
};
pub use store::{MemoryStore, Store, StoreError};
