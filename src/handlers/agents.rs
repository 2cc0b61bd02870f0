//! Admin-only agent management.
//!
//! Every route here sits behind `require_admin`. The caller's subject is the
//! owning admin (`admin_sub`), and mutations are mirrored to the identity
//! provider through [`AgentService`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Agent, AgentPatch, AgentSearch, Deleted, NewAgent};
use crate::database::Listing;
use crate::handlers::ensure_hard_delete_allowed;
use crate::handlers::query::{DeleteParams, PageParams, SearchParams};
use crate::handlers::validation::Validate;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AgentService;
use crate::state::AppState;

/// POST /api/agents
pub async fn create(
    State(state): State<AppState>,
    admin: AuthUser,
    body: Result<Json<NewAgent>, JsonRejection>,
) -> ApiResult<Agent> {
    let Json(input) = body?;
    input.validate()?;

    let agent = AgentService::new(&state).create(admin.subject, &input).await?;
    Ok(ApiResponse::created(agent))
}

/// GET /api/agents
pub async fn list(
    State(state): State<AppState>,
    admin: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Listing<Agent>> {
    let Query(paging) = paging?;
    let page = paging.page(&state.config.api)?;

    let listing = AgentService::new(&state).list(admin.subject, page).await?;
    Ok(ApiResponse::success(listing))
}

/// GET /api/agents/search?q=
pub async fn search(
    State(state): State<AppState>,
    admin: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    search: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Listing<Agent>> {
    let Query(paging) = paging?;
    let Query(search) = search?;
    let page = paging.page(&state.config.api)?;

    let listing = AgentService::new(&state).search(admin.subject, search.query()?, page).await?;
    Ok(ApiResponse::success(listing))
}

/// GET /api/agents/search/fields?first_name=&last_name=&email=&mode=strict|loose
pub async fn search_fields(
    State(state): State<AppState>,
    admin: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    search: Result<Query<AgentSearch>, QueryRejection>,
) -> ApiResult<Listing<Agent>> {
    let Query(paging) = paging?;
    let Query(search) = search?;
    search.validate()?;
    let page = paging.page(&state.config.api)?;

    let listing = AgentService::new(&state).search_fields(admin.subject, &search, page).await?;
    Ok(ApiResponse::success(listing))
}

/// GET /api/agents/:id
pub async fn get(
    State(state): State<AppState>,
    admin: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Agent> {
    let Path(id) = path?;
    let agent = AgentService::new(&state).get(admin.subject, id).await?;
    Ok(ApiResponse::success(agent))
}

/// PATCH /api/agents/:id
pub async fn update(
    State(state): State<AppState>,
    admin: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AgentPatch>, JsonRejection>,
) -> ApiResult<Option<Agent>> {
    let Path(id) = path?;
    let Json(patch) = body?;
    patch.validate()?;

    let outcome = AgentService::new(&state).update(admin.subject, id, &patch).await?;
    Ok(ApiResponse::success(outcome.into_option()))
}

/// POST /api/agents/:id/disable
pub async fn disable(
    State(state): State<AppState>,
    admin: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Agent> {
    let Path(id) = path?;
    let agent = AgentService::new(&state).disable(admin.subject, id).await?;
    Ok(ApiResponse::success(agent))
}

/// POST /api/agents/:id/enable
pub async fn enable(
    State(state): State<AppState>,
    admin: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Agent> {
    let Path(id) = path?;
    let agent = AgentService::new(&state).enable(admin.subject, id).await?;
    Ok(ApiResponse::success(agent))
}

/// DELETE /api/agents/:id?reason=
pub async fn soft_delete(
    State(state): State<AppState>,
    admin: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> ApiResult<Deleted> {
    let Path(id) = path?;
    let Query(params) = params?;

    let deleted = AgentService::new(&state)
        .soft_delete(admin.subject, id, params.reason()?)
        .await?;
    Ok(ApiResponse::success(deleted))
}

/// DELETE /api/agents/:id/hard
pub async fn hard_delete(
    State(state): State<AppState>,
    admin: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    ensure_hard_delete_allowed(&state)?;
    let Path(id) = path?;

    let deleted = AgentService::new(&state).hard_delete(admin.subject, id).await?;
    Ok(ApiResponse::success(json!({ "id": deleted })))
}
