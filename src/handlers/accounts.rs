use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Account, AccountPatch, Deleted, NewAccount};
use crate::database::{FieldValue, Listing};
use crate::handlers::query::{AccountFilters, DeleteParams, PageParams, SearchParams};
use crate::handlers::validation::Validate;
use crate::handlers::ensure_hard_delete_allowed;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /api/accounts
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<NewAccount>, JsonRejection>,
) -> ApiResult<Account> {
    let Json(input) = body?;
    input.validate()?;

    let account = state.store::<Account>().create(user.subject, input.field_set()).await?;
    Ok(ApiResponse::created(account))
}

/// GET /api/accounts?limit=&offset=&client_id=&branch_id=
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    filters: Result<Query<AccountFilters>, QueryRejection>,
) -> ApiResult<Listing<Account>> {
    let Query(paging) = paging?;
    let Query(filters) = filters?;
    let page = paging.page(&state.config.api)?;

    let mut equals = Vec::new();
    if let Some(client_id) = filters.client_id {
        equals.push(("client_id", FieldValue::from(client_id)));
    }
    if let Some(branch_id) = filters.branch_id {
        equals.push(("branch_id", FieldValue::from(branch_id)));
    }

    let items = state.store::<Account>().list(user.subject, &equals, page).await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/accounts/search?q=
pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    search: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Listing<Account>> {
    let Query(paging) = paging?;
    let Query(search) = search?;
    let page = paging.page(&state.config.api)?;

    let items = state.store::<Account>().search(user.subject, search.query()?, page).await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/accounts/:id
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Account> {
    let Path(id) = path?;
    let account = state.store::<Account>().get(id, user.subject).await?;
    Ok(ApiResponse::success(account))
}

/// PATCH /api/accounts/:id
///
/// An empty body changes nothing and answers `data: null`.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AccountPatch>, JsonRejection>,
) -> ApiResult<Option<Account>> {
    let Path(id) = path?;
    let Json(patch) = body?;
    patch.validate()?;

    let outcome = state.store::<Account>().update(id, user.subject, patch.field_set()).await?;
    Ok(ApiResponse::success(outcome.into_option()))
}

/// POST /api/accounts/:id/verify
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Account> {
    let Path(id) = path?;
    let account = state.store::<Account>().verify(id, user.subject).await?;
    Ok(ApiResponse::success(account))
}

/// DELETE /api/accounts/:id?reason=
pub async fn soft_delete(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> ApiResult<Deleted> {
    let Path(id) = path?;
    let Query(params) = params?;

    let deleted = state.store::<Account>().soft_delete(id, user.subject, params.reason()?).await?;
    Ok(ApiResponse::success(deleted))
}

/// DELETE /api/accounts/:id/hard
pub async fn hard_delete(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    ensure_hard_delete_allowed(&state)?;
    let Path(id) = path?;

    let deleted = state.store::<Account>().hard_delete(id, user.subject).await?;
    Ok(ApiResponse::success(json!({ "id": deleted })))
}
