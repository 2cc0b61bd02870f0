use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::SecurityConfig;
use crate::handlers::{accounts, agents, profiles, public, verification_requests};
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::state::AppState;

/// Builds the full application router.
///
/// `/` and `/health` are public. Everything under `/api` requires a valid
/// access token, and `/api/agents` additionally requires the admin group.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(account_routes())
        .merge(profile_routes())
        .merge(verification_request_routes())
        .merge(agent_routes(state.clone()))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut app = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(protected)
        .layer(cors_layer(&state.config.security));

    if state.config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/accounts", get(accounts::list).post(accounts::create))
        .route("/api/accounts/search", get(accounts::search))
        .route(
            "/api/accounts/:id",
            get(accounts::get).patch(accounts::update).delete(accounts::soft_delete),
        )
        .route("/api/accounts/:id/verify", post(accounts::verify))
        .route("/api/accounts/:id/hard", delete(accounts::hard_delete))
}

fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profiles", get(profiles::list).post(profiles::create))
        .route("/api/profiles/search", get(profiles::search))
        .route("/api/profiles/search/fields", get(profiles::search_fields))
        .route(
            "/api/profiles/:id",
            get(profiles::get).patch(profiles::update).delete(profiles::soft_delete),
        )
        .route("/api/profiles/:id/verify", post(profiles::verify))
        .route("/api/profiles/:id/hard", delete(profiles::hard_delete))
}

fn verification_request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/verification-requests",
            get(verification_requests::list).post(verification_requests::create),
        )
        .route("/api/verification-requests/search", get(verification_requests::search))
        .route(
            "/api/verification-requests/:id",
            get(verification_requests::get)
                .patch(verification_requests::update)
                .delete(verification_requests::soft_delete),
        )
        .route("/api/verification-requests/:id/verify", post(verification_requests::verify))
        .route("/api/verification-requests/:id/reject", post(verification_requests::reject))
        .route("/api/verification-requests/:id/hard", delete(verification_requests::hard_delete))
}

fn agent_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/agents", get(agents::list).post(agents::create))
        .route("/api/agents/search", get(agents::search))
        .route("/api/agents/search/fields", get(agents::search_fields))
        .route(
            "/api/agents/:id",
            get(agents::get).patch(agents::update).delete(agents::soft_delete),
        )
        .route("/api/agents/:id/disable", post(agents::disable))
        .route("/api/agents/:id/enable", post(agents::enable))
        .route("/api/agents/:id/hard", delete(agents::hard_delete))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let methods = [Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS];
    let layer = CorsLayer::new().allow_methods(methods).allow_headers(Any);

    if security.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
