use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{RecordMeta, UnknownVariant};
use crate::database::field_set::FieldSet;
use crate::database::resource::{Resource, ResourceSchema};
use crate::database::statements::{FieldCriterion, SearchMode};

pub const PROFILE_SCHEMA: ResourceSchema = ResourceSchema {
    name: "profile",
    table: "profiles.profile_list",
    owner_column: "agent_id",
    columns: "id, agent_id, first_name, last_name, date_of_birth, gender, email::text AS email, phone_number, \
              address, city, state, country, postal, \
              status, created_at, updated_at, deleted_at, deleted_by, delete_reason",
    writable: &[
        "agent_id",
        "first_name",
        "last_name",
        "date_of_birth",
        "gender",
        "email",
        "phone_number",
        "address",
        "city",
        "state",
        "country",
        "postal",
    ],
    order_by: "created_at DESC",
    search_columns: &["first_name", "last_name", "email", "phone_number", "city", "country", "status"],
    filter_columns: &[],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "M" => Ok(Gender::M),
            "F" => Ok(Gender::F),
            _ => Err(UnknownVariant(value)),
        }
    }
}

/// A client profile owned by an agent
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Resource for Profile {
    const SCHEMA: &'static ResourceSchema = &PROFILE_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Uuid {
        self.agent_id
    }
}

/// Strips the separators people type into phone numbers
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal: String,
}

impl NewProfile {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set("first_name", self.first_name.trim())
            .set("last_name", self.last_name.trim())
            .set("date_of_birth", self.date_of_birth)
            .set("gender", self.gender.as_str())
            .set("email", self.email.trim())
            .set("phone_number", normalize_phone(&self.phone_number))
            .set("address", self.address.trim())
            .set("city", self.city.trim())
            .set("state", self.state.trim())
            .set("country", self.country.trim())
            .set("postal", self.postal.trim());
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal: Option<String>,
    /// Transfers the profile to another agent
    pub new_agent_id: Option<Uuid>,
}

impl ProfilePatch {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set_if("first_name", self.first_name.as_deref().map(str::trim))
            .set_if("last_name", self.last_name.as_deref().map(str::trim))
            .set_if("date_of_birth", self.date_of_birth)
            .set_if("gender", self.gender.map(|g| g.as_str()))
            .set_if("email", self.email.as_deref().map(str::trim))
            .set_if("phone_number", self.phone_number.as_deref().map(normalize_phone))
            .set_if("address", self.address.as_deref().map(str::trim))
            .set_if("city", self.city.as_deref().map(str::trim))
            .set_if("state", self.state.as_deref().map(str::trim))
            .set_if("country", self.country.as_deref().map(str::trim))
            .set_if("postal", self.postal.as_deref().map(str::trim))
            .set_if("agent_id", self.new_agent_id);
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSearch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub mode: SearchMode,
}

impl ProfileSearch {
    pub fn criteria(&self) -> Vec<FieldCriterion> {
        vec![
            FieldCriterion::text("first_name", self.first_name.clone()),
            FieldCriterion::text("last_name", self.last_name.clone()),
            FieldCriterion::email("email", self.email.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::field_set::FieldValue;

    #[test]
    fn phone_separators_are_removed() {
        assert_eq!(normalize_phone("+65 9123-4567"), "+6591234567");
    }

    #[test]
    fn patch_normalizes_phone_and_keeps_order() {
        let patch = ProfilePatch {
            phone_number: Some("9123 4567".to_string()),
            city: Some(" Singapore".to_string()),
            ..Default::default()
        };

        let fields = patch.field_set();
        assert_eq!(fields.columns().collect::<Vec<_>>(), vec!["phone_number", "city"]);
        assert_eq!(fields.get("phone_number"), Some(&FieldValue::from("91234567")));
    }
}
