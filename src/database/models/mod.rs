pub mod account;
pub mod agent;
pub mod profile;
pub mod verification_request;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

pub use account::{Account, AccountPatch, AccountType, NewAccount};
pub use agent::{Agent, AgentPatch, AgentSearch, NewAgent};
pub use profile::{Gender, NewProfile, Profile, ProfilePatch, ProfileSearch};
pub use verification_request::{
    reject_transition, verify_transition, NewVerificationRequest, RejectBody, VerificationRequest,
    VerificationRequestPatch,
};

/// Lifecycle state shared by every resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Inactive,
    Active,
    Disabled,
}

#[derive(Debug, Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Inactive => "Inactive",
            Status::Active => "Active",
            Status::Disabled => "Disabled",
        }
    }
}

impl TryFrom<String> for Status {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Inactive" => Ok(Status::Inactive),
            "Active" => Ok(Status::Active),
            "Disabled" => Ok(Status::Disabled),
            _ => Err(UnknownVariant(value)),
        }
    }
}

/// Columns every resource table carries besides its id and owner
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecordMeta {
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub delete_reason: Option<String>,
}

/// Result of a soft delete
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted_at: DateTime<Utc>,
}
