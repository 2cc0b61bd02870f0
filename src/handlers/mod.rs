// handlers/mod.rs - one module per resource, plus the public endpoints
//
// Public (no auth): /, /health
// Protected (JWT): /api/accounts, /api/profiles, /api/verification-requests
// Admin (JWT + admin group): /api/agents

pub mod accounts;
pub mod agents;
pub mod profiles;
pub mod public;
pub mod query;
pub mod validation;
pub mod verification_requests;

use crate::error::ApiError;
use crate::state::AppState;

/// Hard delete routes answer 403 unless the deployment opted in
pub(crate) fn ensure_hard_delete_allowed(state: &AppState) -> Result<(), ApiError> {
    if state.config.api.allow_hard_delete {
        Ok(())
    } else {
        Err(ApiError::forbidden("Hard delete is disabled"))
    }
}
