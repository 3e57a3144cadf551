//! OAuth2 wire types - token endpoint request/response and the RFC 6749
//! error envelope.

use serde::{Deserialize, Serialize};

use crate::services::{AuthError, IssuedToken};

/// Form body of a token endpoint request.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantTokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub totp: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

/// Successful token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<IssuedToken> for GrantTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        let scope = if issued.access.scopes.is_empty() {
            None
        } else {
            Some(issued.access.scopes.to_string())
        };
        Self {
            access_token: issued.access.value.clone(),
            token_type: "Bearer".to_string(),
            expires_in: issued.access.expires_in(),
            refresh_token: issued.refresh.map(|t| t.value),
            scope,
        }
    }
}

/// RFC 6749 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuth2ErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
    ServerError,
}

/// RFC 6749 error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Error {
    pub error: OAuth2ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuth2Error {
    pub fn new(error: OAuth2ErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }
}

impl From<AuthError> for OAuth2Error {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::InvalidClient => OAuth2ErrorCode::InvalidClient,
            AuthError::InvalidScope => OAuth2ErrorCode::InvalidScope,
            AuthError::GrantNotAllowed => OAuth2ErrorCode::UnauthorizedClient,
            AuthError::UnsupportedGrantType => OAuth2ErrorCode::UnsupportedGrantType,
            AuthError::Internal(_) => OAuth2ErrorCode::ServerError,
            AuthError::CredentialRequirements(_) => OAuth2ErrorCode::InvalidRequest,
            // credential and token failures all collapse to invalid_grant
            _ => OAuth2ErrorCode::InvalidGrant,
        };
        // the description is the stable code, never backend detail
        OAuth2Error::new(code, err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OAuthToken, ScopeSet, TokenKind};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[test]
    fn response_carries_scope_and_refresh_when_present() {
        let account_id = Uuid::new_v4();
        let access = OAuthToken::new(
            account_id,
            "app",
            TokenKind::AccessToken,
            "access-value".to_string(),
            ScopeSet::parse("email"),
            Utc::now() + Duration::seconds(600),
        );
        let refresh = OAuthToken::new(
            account_id,
            "app",
            TokenKind::RefreshToken,
            "refresh-value".to_string(),
            ScopeSet::parse("email"),
            Utc::now() + Duration::days(365),
        );

        let response = GrantTokenResponse::from(IssuedToken {
            access,
            refresh: Some(refresh),
        });
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.access_token, "access-value");
        assert_eq!(response.refresh_token.as_deref(), Some("refresh-value"));
        assert_eq!(response.scope.as_deref(), Some("email"));
        assert!(response.expires_in > 0 && response.expires_in <= 600);
    }

    #[test]
    fn auth_errors_map_to_rfc_codes() {
        let cases = [
            (AuthError::InvalidClient, OAuth2ErrorCode::InvalidClient),
            (AuthError::InvalidScope, OAuth2ErrorCode::InvalidScope),
            (AuthError::GrantNotAllowed, OAuth2ErrorCode::UnauthorizedClient),
            (
                AuthError::UnsupportedGrantType,
                OAuth2ErrorCode::UnsupportedGrantType,
            ),
            (AuthError::InvalidCredentials, OAuth2ErrorCode::InvalidGrant),
            (AuthError::ConsumedToken, OAuth2ErrorCode::InvalidGrant),
            (AuthError::TotpMissing, OAuth2ErrorCode::InvalidGrant),
            (
                AuthError::Internal(anyhow::anyhow!("boom")),
                OAuth2ErrorCode::ServerError,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(OAuth2Error::from(err).error, code);
        }
    }

    #[test]
    fn error_envelope_serializes_snake_case() {
        let err = OAuth2Error::new(OAuth2ErrorCode::InvalidGrant, "invalid-credentials");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["error_description"], "invalid-credentials");
    }
}
