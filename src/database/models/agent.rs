use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::RecordMeta;
use crate::database::field_set::FieldSet;
use crate::database::resource::{Resource, ResourceSchema};
use crate::database::statements::{FieldCriterion, SearchMode};

pub const AGENT_SCHEMA: ResourceSchema = ResourceSchema {
    name: "agent",
    table: "agents.agent_list",
    owner_column: "admin_sub",
    columns: "id, admin_sub, first_name, last_name, email::text AS email, role, identity_sub, \
              status, created_at, updated_at, deleted_at, deleted_by, delete_reason",
    writable: &["first_name", "last_name", "email", "identity_sub"],
    order_by: "created_at DESC",
    search_columns: &["first_name", "last_name", "email", "status"],
    filter_columns: &[],
};

/// An agent managed by an administrator, mirrored as a user in the identity provider
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub admin_sub: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    /// Subject assigned by the identity provider, set once the user exists there
    pub identity_sub: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Agent {
    /// Username the identity provider knows this agent by
    pub fn identity_username(&self) -> &str {
        self.identity_sub.as_deref().unwrap_or(&self.email)
    }
}

impl Resource for Agent {
    const SCHEMA: &'static ResourceSchema = &AGENT_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Uuid {
        self.admin_sub
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAgent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl NewAgent {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set("first_name", self.first_name.trim())
            .set("last_name", self.last_name.trim())
            .set("email", self.email.trim());
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl AgentPatch {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set_if("first_name", self.first_name.as_deref().map(str::trim))
            .set_if("last_name", self.last_name.as_deref().map(str::trim))
            .set_if("email", self.email.as_deref().map(str::trim));
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSearch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub mode: SearchMode,
}

impl AgentSearch {
    pub fn criteria(&self) -> Vec<FieldCriterion> {
        vec![
            FieldCriterion::text("first_name", self.first_name.clone()),
            FieldCriterion::text("last_name", self.last_name.clone()),
            FieldCriterion::email("email", self.email.clone()),
        ]
    }
}
