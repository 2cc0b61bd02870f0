use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Deleted, NewProfile, Profile, ProfilePatch, ProfileSearch};
use crate::database::Listing;
use crate::handlers::ensure_hard_delete_allowed;
use crate::handlers::query::{DeleteParams, PageParams, SearchParams};
use crate::handlers::validation::Validate;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /api/profiles
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<NewProfile>, JsonRejection>,
) -> ApiResult<Profile> {
    let Json(input) = body?;
    input.validate()?;

    let profile = state.store::<Profile>().create(user.subject, input.field_set()).await?;
    Ok(ApiResponse::created(profile))
}

/// GET /api/profiles
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Listing<Profile>> {
    let Query(paging) = paging?;
    let page = paging.page(&state.config.api)?;

    let items = state.store::<Profile>().list(user.subject, &[], page).await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/profiles/search?q=
pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    search: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Listing<Profile>> {
    let Query(paging) = paging?;
    let Query(search) = search?;
    let page = paging.page(&state.config.api)?;

    let items = state.store::<Profile>().search(user.subject, search.query()?, page).await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/profiles/search/fields?first_name=&last_name=&email=&mode=strict|loose
pub async fn search_fields(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    search: Result<Query<ProfileSearch>, QueryRejection>,
) -> ApiResult<Listing<Profile>> {
    let Query(paging) = paging?;
    let Query(search) = search?;
    search.validate()?;
    let page = paging.page(&state.config.api)?;

    let items = state
        .store::<Profile>()
        .search_fields(user.subject, &search.criteria(), search.mode, page)
        .await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/profiles/:id
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Profile> {
    let Path(id) = path?;
    let profile = state.store::<Profile>().get(id, user.subject).await?;
    Ok(ApiResponse::success(profile))
}

/// PATCH /api/profiles/:id
///
/// `new_agent_id` hands the profile over to another agent. After that the
/// caller no longer owns it.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult<Option<Profile>> {
    let Path(id) = path?;
    let Json(patch) = body?;
    patch.validate()?;

    let outcome = state.store::<Profile>().update(id, user.subject, patch.field_set()).await?;
    Ok(ApiResponse::success(outcome.into_option()))
}

/// POST /api/profiles/:id/verify
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Profile> {
    let Path(id) = path?;
    let profile = state.store::<Profile>().verify(id, user.subject).await?;
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/profiles/:id?reason=
pub async fn soft_delete(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> ApiResult<Deleted> {
    let Path(id) = path?;
    let Query(params) = params?;

    let deleted = state.store::<Profile>().soft_delete(id, user.subject, params.reason()?).await?;
    Ok(ApiResponse::success(deleted))
}

/// DELETE /api/profiles/:id/hard
pub async fn hard_delete(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    ensure_hard_delete_allowed(&state)?;
    let Path(id) = path?;

    let deleted = state.store::<Profile>().hard_delete(id, user.subject).await?;
    Ok(ApiResponse::success(json!({ "id": deleted })))
}
