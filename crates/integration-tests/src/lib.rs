//! Integration test support for Tableside.
//!
//! Builds the full service in-process: one shared document store, one
//! identity provider, the axum router on top, and (where a test needs it) the
//! client-side sync managers against the same store. Requests go through
//! `tower::ServiceExt::oneshot`; no sockets are opened.

// Test support code; panicking on setup failure is the desired behavior.
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use tableside_api::bootstrap;
use tableside_api::config::{ApiConfig, BootstrapAccountConfig};
use tableside_api::state::AppState;
use tableside_core::Role;
use tableside_identity::IdentityProvider;
use tableside_store::MemoryStore;

pub const ADMIN_EMAIL: &str = "admin@tableside.test";
pub const MANAGER_EMAIL: &str = "manager@tableside.test";
pub const STAFF_EMAIL: &str = "staff@tableside.test";
pub const SEED_PASSWORD: &str = "N0t-Gu3ssable!";

/// A fully wired in-process deployment.
pub struct TestContext {
    pub store: MemoryStore,
    pub identity: IdentityProvider,
    pub state: AppState,
}

impl TestContext {
    /// Context with the default one-hour token lifetime.
    pub async fn new() -> Self {
        Self::with_token_ttl(Duration::hours(1)).await
    }

    /// Context with a custom token lifetime (zero makes every token already
    /// expired).
    pub async fn with_token_ttl(ttl: Duration) -> Self {
        let store = MemoryStore::new();
        let identity = IdentityProvider::with_token_ttl(ttl);
        let state = AppState::new(test_config(), store.clone(), identity.clone());
        bootstrap::seed(&state).await.unwrap();
        Self {
            store,
            identity,
            state,
        }
    }

    /// A fresh router over the shared state.
    pub fn router(&self) -> Router {
        tableside_api::app(self.state.clone())
    }

    /// Sign in and return the raw token string.
    pub async fn token_for(&self, email: &str) -> String {
        self.identity
            .sign_in(email, SEED_PASSWORD)
            .await
            .unwrap()
            .as_str()
            .to_owned()
    }

    /// Create a regular user credential plus profile and return
    /// `(subject id, token)`.
    pub async fn signed_up_user(&self, name: &str) -> (String, String) {
        let email = format!("{name}@tableside.test");
        let uid = self
            .identity
            .create_user(&email, SEED_PASSWORD, Some(name))
            .await
            .unwrap();
        let token = self
            .identity
            .sign_in(&email, SEED_PASSWORD)
            .await
            .unwrap()
            .as_str()
            .to_owned();

        let (status, _) = self
            .send(
                Method::POST,
                "/api/users",
                Some(&token),
                Some(serde_json::json!({"username": name})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (uid, token)
    }

    /// Fire a request through the router and return status plus parsed JSON
    /// body (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

fn test_config() -> ApiConfig {
    ApiConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        bootstrap_accounts: vec![
            account("admin", ADMIN_EMAIL, Role::Admin),
            account("manager", MANAGER_EMAIL, Role::Manager),
            account("staff", STAFF_EMAIL, Role::Staff),
        ],
        token_ttl_secs: 3600,
        menu_cache_ttl_secs: 60,
        seed_menu: true,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn account(username: &str, email: &str, role: Role) -> BootstrapAccountConfig {
    BootstrapAccountConfig {
        username: username.to_owned(),
        email: email.to_owned(),
        password: SecretString::from(SEED_PASSWORD),
        role,
    }
}
