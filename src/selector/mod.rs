//! Authentication selector - picks how a request proves its identity.
//!
//! Strategies are consulted in registration order. A strategy first says
//! whether the request carries its kind of material at all; the first
//! one that does handles the request exclusively. Its failure is final:
//! a request never falls through to a later strategy once one has
//! engaged, so a bad credential of one kind cannot be shopped around.
//! When no strategy engages the request is reported as unhandled so
//! callers can distinguish "bad credentials" from "no credentials".

pub mod bearer;
pub mod secret;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use http::request::Parts;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::SessionSource;

pub use bearer::BearerStrategy;
pub use secret::SharedSecretStrategy;
pub use session::SessionStrategy;

/// The identity a strategy established for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub source: SessionSource,
}

#[derive(Debug, Error)]
pub enum SelectorRejection {
    /// A strategy engaged and rejected the request.
    #[error("unauthenticated")]
    Unauthenticated { reasons: Vec<String> },
    /// No strategy recognized the request's credentials at all.
    #[error("no authentication strategy matched the request")]
    NoStrategyMatched,
}

#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the request carries this strategy's kind of credential.
    fn handles(&self, parts: &Parts) -> bool;

    /// Authenticate a request this strategy handles. The error message
    /// feeds the aggregated rejection, so it must not leak secrets.
    async fn authenticate(&self, parts: &Parts) -> Result<AuthContext, String>;
}

#[derive(Clone, Default)]
pub struct AuthSelector {
    strategies: Vec<Arc<dyn AuthStrategy>>,
}

impl AuthSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, strategy: Arc<dyn AuthStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub async fn authenticate(&self, parts: &Parts) -> Result<AuthContext, SelectorRejection> {
        for strategy in &self.strategies {
            if !strategy.handles(parts) {
                continue;
            }
            // the first engaging strategy is terminal
            return match strategy.authenticate(parts).await {
                Ok(context) => {
                    debug!(strategy = strategy.name(), account_id = %context.account_id, "request authenticated");
                    Ok(context)
                }
                Err(reason) => Err(SelectorRejection::Unauthenticated {
                    reasons: vec![format!("{}: {reason}", strategy.name())],
                }),
            };
        }
        Err(SelectorRejection::NoStrategyMatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStrategy {
        name: &'static str,
        header: &'static str,
        result: Result<AuthContext, String>,
    }

    #[async_trait]
    impl AuthStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handles(&self, parts: &Parts) -> bool {
            parts.headers.contains_key(self.header)
        }

        async fn authenticate(&self, _parts: &Parts) -> Result<AuthContext, String> {
            self.result.clone()
        }
    }

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Request::builder().uri("/protected");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn context() -> AuthContext {
        AuthContext {
            account_id: Uuid::new_v4(),
            source: SessionSource::Login,
        }
    }

    #[tokio::test]
    async fn first_matching_success_wins() {
        let winner = context();
        let selector = AuthSelector::new()
            .register(Arc::new(FixedStrategy {
                name: "first",
                header: "x-first",
                result: Ok(winner),
            }))
            .register(Arc::new(FixedStrategy {
                name: "second",
                header: "x-first",
                result: Ok(context()),
            }));

        let parts = parts_with_headers(&[("x-first", "1")]);
        let got = selector.authenticate(&parts).await.unwrap();
        assert_eq!(got, winner);
    }

    #[tokio::test]
    async fn the_first_engaging_strategy_is_terminal() {
        // a later strategy could succeed, but must never be reached
        let selector = AuthSelector::new()
            .register(Arc::new(FixedStrategy {
                name: "cookie",
                header: "cookie",
                result: Err("expired".to_string()),
            }))
            .register(Arc::new(FixedStrategy {
                name: "bearer",
                header: "authorization",
                result: Ok(context()),
            }));

        let parts = parts_with_headers(&[("cookie", "a=b"), ("authorization", "Bearer x")]);
        match selector.authenticate(&parts).await {
            Err(SelectorRejection::Unauthenticated { reasons }) => {
                assert_eq!(reasons, vec!["cookie: expired".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrecognized_requests_are_reported_as_unhandled() {
        let selector = AuthSelector::new().register(Arc::new(FixedStrategy {
            name: "cookie",
            header: "cookie",
            result: Err("never reached".to_string()),
        }));

        let parts = parts_with_headers(&[]);
        assert!(matches!(
            selector.authenticate(&parts).await,
            Err(SelectorRejection::NoStrategyMatched)
        ));
    }

    #[tokio::test]
    async fn non_engaging_strategies_are_skipped_over() {
        let winner = context();
        let selector = AuthSelector::new()
            .register(Arc::new(FixedStrategy {
                name: "cookie",
                header: "cookie",
                result: Err("never engages".to_string()),
            }))
            .register(Arc::new(FixedStrategy {
                name: "bearer",
                header: "authorization",
                result: Ok(winner),
            }));

        // no cookie header, so the bearer strategy is the first to engage
        let parts = parts_with_headers(&[("authorization", "Bearer x")]);
        assert_eq!(selector.authenticate(&parts).await.unwrap(), winner);
    }
}
