pub mod oauth;

pub use oauth::{GrantTokenRequest, GrantTokenResponse, OAuth2Error, OAuth2ErrorCode};
