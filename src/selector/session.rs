//! Cookie-backed session strategy.

use async_trait::async_trait;
use cookie::Cookie;
use http::header::COOKIE;
use http::request::Parts;

use crate::services::SessionService;

use super::{AuthContext, AuthStrategy};

pub struct SessionStrategy {
    sessions: SessionService,
}

impl SessionStrategy {
    pub fn new(sessions: SessionService) -> Self {
        Self { sessions }
    }

    fn session_token(&self, parts: &Parts) -> Option<String> {
        for header in parts.headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            for cookie in Cookie::split_parse(raw.to_string()).flatten() {
                if cookie.name() == self.sessions.cookie_name() {
                    return Some(cookie.value().to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl AuthStrategy for SessionStrategy {
    fn name(&self) -> &'static str {
        "session-cookie"
    }

    fn handles(&self, parts: &Parts) -> bool {
        self.session_token(parts).is_some()
    }

    async fn authenticate(&self, parts: &Parts) -> Result<AuthContext, String> {
        let token = self
            .session_token(parts)
            .ok_or_else(|| "missing session cookie".to_string())?;
        let claims = self
            .sessions
            .verify_session(&token)
            .map_err(|e| e.code().to_string())?;
        Ok(AuthContext {
            account_id: claims.sub,
            source: claims.src,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OneTimeConfig, SessionConfig, SessionJwtConfig};
    use crate::models::{Account, SessionSource};
    use crate::services::{EmailWorker, TracingEmailProvider};
    use crate::store::{AccountStore, MemoryStore};
    use std::sync::Arc;

    async fn fixture() -> (SessionService, Account) {
        let store = Arc::new(MemoryStore::new());
        let account = Account::new("alice@example.com");
        store.create_account(&account).await.unwrap();

        let config = SessionConfig {
            jwt: SessionJwtConfig {
                signing_key: "a-long-enough-secret".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let email = EmailWorker::start(Arc::new(TracingEmailProvider), 1, 4);
        (
            SessionService::new(store, config, OneTimeConfig::default(), email),
            account,
        )
    }

    fn parts_with_cookie(raw: &str) -> Parts {
        let (parts, ()) = http::Request::builder()
            .uri("/protected")
            .header(COOKIE, raw)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn valid_cookie_authenticates() {
        let (sessions, account) = fixture().await;
        let token = sessions
            .issue_session(account.id, SessionSource::Login)
            .await
            .unwrap();
        let strategy = SessionStrategy::new(sessions);

        let parts = parts_with_cookie(&format!("other=1; auth={token}"));
        assert!(strategy.handles(&parts));
        let context = strategy.authenticate(&parts).await.unwrap();
        assert_eq!(context.account_id, account.id);
        assert_eq!(context.source, SessionSource::Login);
    }

    #[tokio::test]
    async fn garbage_cookie_is_rejected() {
        let (sessions, _) = fixture().await;
        let strategy = SessionStrategy::new(sessions);

        let parts = parts_with_cookie("auth=not-a-jwt");
        assert!(strategy.handles(&parts));
        assert_eq!(
            strategy.authenticate(&parts).await.unwrap_err(),
            "invalid-token"
        );
    }

    #[tokio::test]
    async fn absent_cookie_is_not_handled() {
        let (sessions, _) = fixture().await;
        let strategy = SessionStrategy::new(sessions);
        let parts = parts_with_cookie("other=1");
        assert!(!strategy.handles(&parts));
    }
}
