use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{decode_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    /// Owner id for everything the caller reads or writes
    pub subject: Uuid,
    pub groups: Vec<String>,
}

impl AuthUser {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            groups: claims.groups,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract JWT from Authorization header
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;

    // Validate and decode JWT
    let claims = decode_jwt(&token, &state.config.security).map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        ApiError::unauthorized(e.to_string())
    })?;

    // Convert claims to AuthUser and inject into request
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Admits only callers in the configured admin group. Must run after `jwt_auth_middleware`.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.in_group(&state.config.security.admin_group) {
        tracing::warn!(subject = %user.subject, "non-admin caller refused");
        return Err(ApiError::forbidden("Administrator access required"));
    }

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
