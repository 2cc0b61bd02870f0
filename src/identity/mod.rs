//! Identity provider admin client.
//!
//! Agents exist twice: as a row in `agents.agent_list` and as a user in the
//! identity provider's pool. The agent service keeps the two in step through
//! the `IdentityProvider` trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("Invalid identity provider endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Identity provider rejected {operation} with status {status}: {message}")]
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },
}

/// A user to create in the identity provider
#[derive(Debug, Clone, Serialize)]
pub struct NewIdentityUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates the user, adds it to `user.group`, and returns the provider's subject
    async fn create_user(&self, user: &NewIdentityUser) -> Result<String, IdentityError>;

    async fn disable_user(&self, username: &str) -> Result<(), IdentityError>;

    async fn enable_user(&self, username: &str) -> Result<(), IdentityError>;

    async fn update_user_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<(), IdentityError>;

    /// Removes the user outright. Only used to undo a `create_user` whose local row never committed.
    async fn delete_user(&self, username: &str) -> Result<(), IdentityError>;
}

/// Talks to the provider's admin REST endpoint
pub struct HttpIdentityProvider {
    client: Client,
    base_url: Option<Url>,
    user_pool_id: String,
    api_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    username: &'a str,
    attributes: Vec<UserAttribute>,
    groups: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateAttributesBody<'a> {
    attributes: &'a [UserAttribute],
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    sub: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|raw| Url::parse(raw).map_err(|e| IdentityError::InvalidEndpoint(e.to_string())))
            .transpose()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            user_pool_id: config.user_pool_id.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// `{base}/userpools/{pool}/users[/{segment}...]`
    fn users_url(&self, segments: &[&str]) -> Result<Url, IdentityError> {
        let mut url = self.base_url.clone().ok_or(IdentityError::NotConfigured)?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| IdentityError::InvalidEndpoint("base URL cannot carry a path".to_string()))?;
            path.pop_if_empty().extend(["userpools", self.user_pool_id.as_str(), "users"]);
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, IdentityError> {
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "identity provider call succeeded");
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        Err(IdentityError::Rejected {
            operation,
            status: status.as_u16(),
            message: if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                "credentials were refused".to_string()
            } else {
                message
            },
        })
    }
}

impl std::fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityProvider")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("user_pool_id", &self.user_pool_id)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_user(&self, user: &NewIdentityUser) -> Result<String, IdentityError> {
        let url = self.users_url(&[])?;
        let body = CreateUserBody {
            username: &user.email,
            attributes: vec![
                UserAttribute::new("email", &user.email),
                UserAttribute::new("email_verified", "true"),
                UserAttribute::new("custom:firstName", &user.first_name),
                UserAttribute::new("custom:lastName", &user.last_name),
            ],
            groups: vec![user.group.as_str()],
        };

        let response = self.send("create_user", Method::POST, url, Some(&body)).await?;
        let created: CreatedUser = response.json().await?;
        Ok(created.sub)
    }

    async fn disable_user(&self, username: &str) -> Result<(), IdentityError> {
        let url = self.users_url(&[username, "disable"])?;
        self.send::<()>("disable_user", Method::POST, url, None).await?;
        Ok(())
    }

    async fn enable_user(&self, username: &str) -> Result<(), IdentityError> {
        let url = self.users_url(&[username, "enable"])?;
        self.send::<()>("enable_user", Method::POST, url, None).await?;
        Ok(())
    }

    async fn update_user_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<(), IdentityError> {
        if attributes.is_empty() {
            return Ok(());
        }
        let url = self.users_url(&[username, "attributes"])?;
        let body = UpdateAttributesBody { attributes };
        self.send("update_user_attributes", Method::PUT, url, Some(&body)).await?;
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<(), IdentityError> {
        let url = self.users_url(&[username])?;
        self.send::<()>("delete_user", Method::DELETE, url, None).await?;
        Ok(())
    }
}
