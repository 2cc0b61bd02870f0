#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use agency_api::auth::{generate_jwt, Claims};
use agency_api::config::AppConfig;
use agency_api::database::DatabaseManager;
use agency_api::identity::{IdentityError, IdentityProvider, NewIdentityUser, UserAttribute};
use agency_api::{app, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

/// One call made against the identity provider
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityCall {
    Create(String),
    Disable(String),
    Enable(String),
    UpdateAttributes(String, Vec<(String, String)>),
    Delete(String),
}

/// Records every call and fails all of them while `failing` is set
#[derive(Default)]
pub struct RecordingIdentityProvider {
    calls: Mutex<Vec<IdentityCall>>,
    failing: AtomicBool,
    next_subject: Mutex<Option<String>>,
}

impl RecordingIdentityProvider {
    pub fn fail_calls(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Subject handed back by the next `create_user` instead of a generated one
    pub fn issue_subject(&self, subject: &str) {
        *self.next_subject.lock().unwrap() = Some(subject.to_string());
    }

    pub fn calls(&self) -> Vec<IdentityCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, call: IdentityCall) -> Result<(), IdentityError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                operation,
                status: 500,
                message: "provider unavailable".to_string(),
            });
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for RecordingIdentityProvider {
    async fn create_user(&self, user: &NewIdentityUser) -> Result<String, IdentityError> {
        self.record("create_user", IdentityCall::Create(user.email.clone()))?;
        let issued = self.next_subject.lock().unwrap().take();
        Ok(issued.unwrap_or_else(|| format!("sub-{}", Uuid::new_v4())))
    }

    async fn disable_user(&self, username: &str) -> Result<(), IdentityError> {
        self.record("disable_user", IdentityCall::Disable(username.to_string()))
    }

    async fn enable_user(&self, username: &str) -> Result<(), IdentityError> {
        self.record("enable_user", IdentityCall::Enable(username.to_string()))
    }

    async fn update_user_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<(), IdentityError> {
        let pairs = attributes.iter().map(|a| (a.name.clone(), a.value.clone())).collect();
        self.record("update_user_attributes", IdentityCall::UpdateAttributes(username.to_string(), pairs))
    }

    async fn delete_user(&self, username: &str) -> Result<(), IdentityError> {
        self.record("delete_user", IdentityCall::Delete(username.to_string()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub identity: Arc<RecordingIdentityProvider>,
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.database.enable_query_logging = false;
    config.api.enable_request_logging = false;
    config.database.max_connections = 2;
    config
}

impl TestApp {
    fn build(config: AppConfig, database: &DatabaseManager) -> Self {
        let identity = Arc::new(RecordingIdentityProvider::default());
        let state = AppState::new(config, database.pool().clone(), identity.clone());
        let router = app(state.clone());
        Self { state, router, identity }
    }

    /// App whose pool never connects; good for everything rejected before the store
    pub fn without_database() -> Self {
        Self::without_database_with(|_| {})
    }

    pub fn without_database_with(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = test_config();
        config.database.url = Some("postgres://127.0.0.1:1/unreachable".to_string());
        config.database.connection_timeout = 1;
        adjust(&mut config);
        let database = DatabaseManager::connect_lazy(&config.database).expect("lazy pool");
        Self::build(config, &database)
    }

    /// Migrated app against `DATABASE_URL`, or `None` when it is unset
    pub async fn with_database() -> Result<Option<Self>> {
        let _ = dotenvy::dotenv();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return Ok(None);
        };

        let mut config = test_config();
        config.database.url = Some(url);
        let database = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to DATABASE_URL")?;
        database.migrate().await?;
        Ok(Some(Self::build(config, &database)))
    }

    pub fn token(&self, subject: Uuid, groups: &[&str]) -> String {
        let groups = groups.iter().map(|g| g.to_string()).collect();
        let claims = Claims::new(subject, groups, &self.state.config.security);
        generate_jwt(&claims, &self.state.config.security).expect("token")
    }

    pub fn admin_token(&self, subject: Uuid) -> String {
        let group = self.state.config.security.admin_group.clone();
        self.token(subject, &[group.as_str()])
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }
}

/// Unique address so unique-email constraints never collide between runs
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}.{}@example.com", Uuid::new_v4().simple())
}

pub fn id_of(body: &Value) -> Uuid {
    body["data"]["id"].as_str().and_then(|s| s.parse().ok()).expect("data.id")
}
