//! Bearer strategy - OAuth2 access tokens on the Authorization header.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::request::Parts;

use crate::models::SessionSource;
use crate::store::{Store, StoreError};

use super::{AuthContext, AuthStrategy};

const SCHEME: &str = "Bearer ";

pub struct BearerStrategy {
    store: Arc<dyn Store>,
}

impl BearerStrategy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthStrategy for BearerStrategy {
    fn name(&self) -> &'static str {
        "bearer"
    }

    fn handles(&self, parts: &Parts) -> bool {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(SCHEME))
    }

    async fn authenticate(&self, parts: &Parts) -> Result<AuthContext, String> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(SCHEME))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| "malformed bearer token".to_string())?;

        match self.store.find_bearer_token(value).await {
            Ok(token) => Ok(AuthContext {
                account_id: token.account_id,
                source: SessionSource::Oauth,
            }),
            Err(StoreError::Expired) => Err("expired token".to_string()),
            Err(StoreError::NotFound) => Err("unknown token".to_string()),
            Err(_) => Err("token lookup failed".to_string()),
        }
    }
}
