#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use portcullis::config::{
    CredentialRequirements, OAuthClientConfig, OAuthConfig, OAuthSettings, OAuthSettingsOverride,
    OneTimeConfig, SessionConfig, SessionJwtConfig, TotpConfig,
};
use portcullis::services::{
    AccountService, EmailWorker, LocalLoginService, OAuthRegistry, SessionService,
    StipulationService, TracingEmailProvider, TwoFactorService,
};
use portcullis::dtos::GrantTokenRequest;
use portcullis::store::MemoryStore;
use portcullis::Account;

pub const CLIENT_ID: &str = "app";
pub const CLIENT_SECRET: &str = "app-secret";
pub const KIOSK_ID: &str = "kiosk";
pub const KIOSK_SECRET: &str = "kiosk-secret";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub accounts: AccountService,
    pub login: LocalLoginService,
    pub sessions: SessionService,
    pub stipulations: StipulationService,
    pub registry: OAuthRegistry,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let two_factor = TwoFactorService::new(TotpConfig::default());
    let email = EmailWorker::start(Arc::new(TracingEmailProvider), 1, 16);

    let session_config = SessionConfig {
        jwt: SessionJwtConfig {
            signing_key: "integration-test-signing-secret".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut clients = HashMap::new();
    // full-featured first-party client
    clients.insert(
        CLIENT_ID.to_string(),
        OAuthClientConfig {
            name: "Test App".to_string(),
            secret: CLIENT_SECRET.to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scopes: vec!["email".to_string(), "name".to_string()],
            overrides: OAuthSettingsOverride {
                allow_credentials: Some(true),
                issue_refresh_token: Some(true),
                ..Default::default()
            },
        },
    );
    // restricted client: code grant only, no refresh tokens
    clients.insert(
        KIOSK_ID.to_string(),
        OAuthClientConfig {
            name: "Kiosk".to_string(),
            secret: KIOSK_SECRET.to_string(),
            redirect_uri: "https://kiosk.example.com/cb".to_string(),
            scopes: vec!["email".to_string()],
            overrides: OAuthSettingsOverride::default(),
        },
    );
    let oauth_config = OAuthConfig {
        settings: OAuthSettings::default(),
        clients,
    };

    Harness {
        store: store.clone(),
        accounts: AccountService::new(store.clone()),
        login: LocalLoginService::new(
            store.clone(),
            CredentialRequirements::default(),
            two_factor,
            email.clone(),
        ),
        sessions: SessionService::new(
            store.clone(),
            session_config,
            OneTimeConfig::default(),
            email,
        ),
        stipulations: StipulationService::new(store.clone()),
        registry: OAuthRegistry::new(&oauth_config, store),
    }
}

/// A token endpoint request with every optional field unset.
pub fn token_request(client_id: &str, client_secret: &str, grant_type: &str) -> GrantTokenRequest {
    GrantTokenRequest {
        grant_type: grant_type.to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        code: None,
        username: None,
        password: None,
        totp: None,
        refresh_token: None,
        scope: None,
        redirect_uri: None,
    }
}

impl Harness {
    /// An active account with a local credential ready to log in.
    pub async fn enrolled_account(&self, email: &str, username: &str, password: &str) -> Account {
        let account = self.accounts.create_account(email).await.unwrap();
        self.login
            .create_credential(account.id, username, password)
            .await
            .unwrap();
        account
    }
}
