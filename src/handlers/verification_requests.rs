use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{
    reject_transition, verify_transition, Deleted, NewVerificationRequest, RejectBody, VerificationRequest,
    VerificationRequestPatch,
};
use crate::database::Listing;
use crate::handlers::ensure_hard_delete_allowed;
use crate::handlers::query::{DeleteParams, PageParams, SearchParams};
use crate::handlers::validation::Validate;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /api/verification-requests
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<NewVerificationRequest>, JsonRejection>,
) -> ApiResult<VerificationRequest> {
    let Json(input) = body?;
    input.validate()?;

    let request = state
        .store::<VerificationRequest>()
        .create(user.subject, input.field_set())
        .await?;
    Ok(ApiResponse::created(request))
}

/// GET /api/verification-requests
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Listing<VerificationRequest>> {
    let Query(paging) = paging?;
    let page = paging.page(&state.config.api)?;

    let items = state.store::<VerificationRequest>().list(user.subject, &[], page).await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/verification-requests/search?q=
pub async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    paging: Result<Query<PageParams>, QueryRejection>,
    search: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Listing<VerificationRequest>> {
    let Query(paging) = paging?;
    let Query(search) = search?;
    let page = paging.page(&state.config.api)?;

    let items = state
        .store::<VerificationRequest>()
        .search(user.subject, search.query()?, page)
        .await?;
    Ok(ApiResponse::success(Listing::new(items, page)))
}

/// GET /api/verification-requests/:id
pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<VerificationRequest> {
    let Path(id) = path?;
    let request = state.store::<VerificationRequest>().get(id, user.subject).await?;
    Ok(ApiResponse::success(request))
}

/// PATCH /api/verification-requests/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<VerificationRequestPatch>, JsonRejection>,
) -> ApiResult<Option<VerificationRequest>> {
    let Path(id) = path?;
    let Json(patch) = body?;

    let outcome = state
        .store::<VerificationRequest>()
        .update(id, user.subject, patch.field_set())
        .await?;
    Ok(ApiResponse::success(outcome.into_option()))
}

/// POST /api/verification-requests/:id/verify
///
/// Records who verified the request. A rejected request cannot be verified.
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<VerificationRequest> {
    let Path(id) = path?;
    let request = state
        .store::<VerificationRequest>()
        .transition(id, user.subject, &verify_transition(user.subject))
        .await?;
    Ok(ApiResponse::success(request))
}

/// POST /api/verification-requests/:id/reject
///
/// The status stays `Inactive`; the rejection is recorded in the
/// `rejected_*` columns. A missing reason falls back to the default one.
pub async fn reject(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<RejectBody>, JsonRejection>,
) -> ApiResult<VerificationRequest> {
    let Path(id) = path?;
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(_)) => RejectBody::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    body.validate()?;

    let transition = reject_transition(user.subject, body.reason.as_deref().map(str::trim));
    let request = state
        .store::<VerificationRequest>()
        .transition(id, user.subject, &transition)
        .await?;
    Ok(ApiResponse::success(request))
}

/// DELETE /api/verification-requests/:id?reason=
pub async fn soft_delete(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> ApiResult<Deleted> {
    let Path(id) = path?;
    let Query(params) = params?;

    let deleted = state
        .store::<VerificationRequest>()
        .soft_delete(id, user.subject, params.reason()?)
        .await?;
    Ok(ApiResponse::success(deleted))
}

/// DELETE /api/verification-requests/:id/hard
pub async fn hard_delete(
    State(state): State<AppState>,
    user: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    ensure_hard_delete_allowed(&state)?;
    let Path(id) = path?;

    let deleted = state.store::<VerificationRequest>().hard_delete(id, user.subject).await?;
    Ok(ApiResponse::success(json!({ "id": deleted })))
}
