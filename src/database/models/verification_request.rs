use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{RecordMeta, Status};
use crate::database::field_set::FieldSet;
use crate::database::resource::{Resource, ResourceSchema, Transition};

pub const DEFAULT_REJECT_REASON: &str = "Poor supporting documents";

pub const VERIFICATION_REQUEST_SCHEMA: ResourceSchema = ResourceSchema {
    name: "verification request",
    table: "requests.request_list",
    owner_column: "submitted_by",
    columns: "id, submitted_by, entity_id, supporting_docs, is_ready, submitted_at, \
              verified_at, verified_by, rejected_at, rejected_by, reject_reason, \
              status, created_at, updated_at, deleted_at, deleted_by, delete_reason",
    writable: &[
        "entity_id",
        "supporting_docs",
        "is_ready",
        "verified_at",
        "verified_by",
        "rejected_at",
        "rejected_by",
        "reject_reason",
    ],
    order_by: "submitted_at DESC, created_at DESC",
    search_columns: &["entity_id", "status", "reject_reason"],
    filter_columns: &["entity_id"],
};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub submitted_by: Uuid,
    /// The profile or account being verified
    pub entity_id: Uuid,
    pub supporting_docs: bool,
    pub is_ready: bool,
    pub submitted_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub reject_reason: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Resource for VerificationRequest {
    const SCHEMA: &'static ResourceSchema = &VERIFICATION_REQUEST_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Uuid {
        self.submitted_by
    }
}

/// Approves a pending request. Rejected requests stay rejected.
pub fn verify_transition(actor: Uuid) -> Transition {
    let mut fields = FieldSet::new();
    fields.set("verified_at", Utc::now()).set("verified_by", actor);
    Transition::verify().with_fields(fields).requiring_null(&["rejected_at"])
}

/// Rejects a pending request. Status stays Inactive; the rejection columns record the outcome.
pub fn reject_transition(actor: Uuid, reason: Option<&str>) -> Transition {
    let mut fields = FieldSet::new();
    fields
        .set("rejected_at", Utc::now())
        .set("rejected_by", actor)
        .set("reject_reason", reason.unwrap_or(DEFAULT_REJECT_REASON));
    Transition {
        from: &[Status::Inactive],
        to: None,
        fields,
        require_null: &["rejected_at"],
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewVerificationRequest {
    pub entity_id: Uuid,
    #[serde(default)]
    pub supporting_docs: bool,
    #[serde(default)]
    pub is_ready: bool,
}

impl NewVerificationRequest {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set("entity_id", self.entity_id)
            .set("supporting_docs", self.supporting_docs)
            .set("is_ready", self.is_ready);
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationRequestPatch {
    pub supporting_docs: Option<bool>,
    pub is_ready: Option<bool>,
}

impl VerificationRequestPatch {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set_if("supporting_docs", self.supporting_docs)
            .set_if("is_ready", self.is_ready);
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectBody {
    pub reason: Option<String>,
}
