pub mod account;
pub mod email;
pub mod error;
pub mod login;
pub mod oauth;
pub mod session;
pub mod stipulations;
pub mod two_factor;

pub use account::AccountService;
pub use email::{EmailMessage, EmailProvider, EmailWorker, TracingEmailProvider};
pub use error::AuthError;
pub use login::LocalLoginService;
pub use oauth::{IssuedToken, OAuthRegistry, OAuthService};
pub use session::{SessionClaims, SessionService};
pub use stipulations::StipulationService;
pub use two_factor::TwoFactorService;

/// Append an audit record, logging instead of failing the caller when the
/// audit store itself is down.
pub(crate) async fn record_audit(
    store: &dyn crate::store::AuditStore,
    record: crate::models::AuditRecord,
) {
    if let Err(err) = store.append_audit(&record).await {
        tracing::warn!(error = %err, account_id = %record.account_id, "failed to append audit record");
    }
}
