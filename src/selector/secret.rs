//! Shared-secret strategy for trusted machine-to-machine callers.
//!
//! The caller presents `Authorization: SharedKey <secret>` plus the
//! account it acts for in `X-Account-UUID`. The secret grants access to
//! any account, so it belongs only on internal surfaces.

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::request::Parts;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::models::SessionSource;

use super::{AuthContext, AuthStrategy};

const SCHEME: &str = "SharedKey ";
const ACCOUNT_HEADER: &str = "x-account-uuid";

pub struct SharedSecretStrategy {
    secret: String,
}

impl SharedSecretStrategy {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

#[async_trait]
impl AuthStrategy for SharedSecretStrategy {
    fn name(&self) -> &'static str {
        "shared-secret"
    }

    fn handles(&self, parts: &Parts) -> bool {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(SCHEME))
    }

    async fn authenticate(&self, parts: &Parts) -> Result<AuthContext, String> {
        let provided = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(SCHEME))
            .ok_or_else(|| "malformed authorization header".to_string())?;

        let expected = self.secret.as_bytes();
        let provided = provided.as_bytes();
        if self.secret.is_empty()
            || expected.len() != provided.len()
            || !bool::from(expected.ct_eq(provided))
        {
            return Err("bad shared key".to_string());
        }

        let account_id = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| "missing or invalid x-account-uuid".to_string())?;

        Ok(AuthContext {
            account_id,
            source: SessionSource::SharedSecret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(authorization: Option<&str>, account: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().uri("/internal");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(value) = account {
            builder = builder.header(ACCOUNT_HEADER, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn correct_key_and_account_authenticate() {
        let strategy = SharedSecretStrategy::new("super-secret");
        let account_id = Uuid::new_v4();
        let parts = parts(
            Some("SharedKey super-secret"),
            Some(&account_id.to_string()),
        );
        assert!(strategy.handles(&parts));
        let context = strategy.authenticate(&parts).await.unwrap();
        assert_eq!(context.account_id, account_id);
        assert_eq!(context.source, SessionSource::SharedSecret);
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let strategy = SharedSecretStrategy::new("super-secret");
        let parts = parts(
            Some("SharedKey wrong"),
            Some(&Uuid::new_v4().to_string()),
        );
        assert_eq!(strategy.authenticate(&parts).await.unwrap_err(), "bad shared key");
    }

    #[tokio::test]
    async fn missing_account_header_is_rejected() {
        let strategy = SharedSecretStrategy::new("super-secret");
        let parts = parts(Some("SharedKey super-secret"), None);
        assert!(strategy.authenticate(&parts).await.is_err());

        let parts = parts_with_bad_uuid();
        assert!(strategy.authenticate(&parts).await.is_err());
    }

    fn parts_with_bad_uuid() -> Parts {
        parts(Some("SharedKey super-secret"), Some("not-a-uuid"))
    }

    #[tokio::test]
    async fn bearer_requests_are_not_handled() {
        let strategy = SharedSecretStrategy::new("super-secret");
        let parts = parts(Some("Bearer token"), None);
        assert!(!strategy.handles(&parts));
    }

    #[tokio::test]
    async fn empty_configured_secret_never_authenticates() {
        let strategy = SharedSecretStrategy::new("");
        let parts = parts(Some("SharedKey "), Some(&Uuid::new_v4().to_string()));
        assert!(strategy.authenticate(&parts).await.is_err());
    }
}
