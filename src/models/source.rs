//! Session source tags - how an authenticated context was established.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an identity was proven. Carried in session claims and in the
/// selector's [`crate::selector::AuthContext`] so downstream policy can
/// differ by source (a onetime-sourced session may skip old-password
/// verification on password change, for example).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionSource {
    Login,
    Onetime,
    Oidc,
    SharedSecret,
    Oauth,
}

impl SessionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSource::Login => "login",
            SessionSource::Onetime => "onetime",
            SessionSource::Oidc => "oidc",
            SessionSource::SharedSecret => "shared-secret",
            SessionSource::Oauth => "oauth",
        }
    }
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
