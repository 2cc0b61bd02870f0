//! SQL generation for owner-scoped resources.
//!
//! Every statement is parameterized. Table and column names come only from
//! static `ResourceSchema` descriptors and are checked against the schema's
//! writable and filter lists before being spliced in.

use serde::Deserialize;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use crate::database::error::ResourceError;
use crate::database::field_set::{bind_query_as, bind_query_scalar, FieldSet, FieldValue};
use crate::database::resource::{ResourceSchema, Transition};

/// SQL text with positionally matched parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl Statement {
    pub(crate) fn query_as<O>(&self) -> QueryAs<'_, Postgres, O, PgArguments>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut q = sqlx::query_as::<_, O>(&self.sql);
        for p in self.params.iter() {
            q = bind_query_as(q, p);
        }
        q
    }

    pub(crate) fn query_scalar<O>(&self) -> QueryScalar<'_, Postgres, O, PgArguments>
    where
        O: Send + Unpin,
        (O,): for<'r> FromRow<'r, PgRow>,
    {
        let mut q = sqlx::query_scalar::<_, O>(&self.sql);
        for p in self.params.iter() {
            q = bind_query_scalar(q, p);
        }
        q
    }
}

/// Offset pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Every supplied field must match exactly, ignoring case
    #[default]
    Strict,
    /// Any supplied field may match; names match by substring
    Loose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-insensitive text; exact in strict mode, substring in loose mode
    Text,
    /// Case-insensitive equality in both modes
    Email,
}

/// One searchable field. `value: None` means the caller did not supply it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCriterion {
    pub column: &'static str,
    pub kind: MatchKind,
    pub value: Option<String>,
}

impl FieldCriterion {
    pub fn text(column: &'static str, value: Option<String>) -> Self {
        Self { column, kind: MatchKind::Text, value }
    }

    pub fn email(column: &'static str, value: Option<String>) -> Self {
        Self { column, kind: MatchKind::Email, value }
    }
}

struct Params {
    values: Vec<FieldValue>,
}

impl Params {
    fn new() -> Self {
        Self { values: Vec::new() }
    }

    fn scoped(id: Uuid, owner: Uuid) -> Self {
        Self { values: vec![FieldValue::from(id), FieldValue::from(owner)] }
    }

    fn push(&mut self, value: impl Into<FieldValue>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn finish(self, sql: String) -> Statement {
        Statement { sql, params: self.values }
    }
}

/// Escapes LIKE metacharacters so user input matches literally
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn check_writable(schema: &ResourceSchema, fields: &FieldSet) -> Result<(), ResourceError> {
    match fields.columns().find(|column| !schema.is_writable(column)) {
        Some(column) => Err(ResourceError::InvalidColumn {
            resource: schema.name,
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

fn live_scope(schema: &ResourceSchema) -> String {
    format!("id = $1 AND {} = $2 AND deleted_at IS NULL", schema.owner_column)
}

fn paging(sql: &mut String, schema: &ResourceSchema, params: &mut Params, page: Page) {
    let limit = params.push(page.limit);
    let offset = params.push(page.offset);
    sql.push_str(&format!(" ORDER BY {}, id DESC LIMIT {} OFFSET {}", schema.order_by, limit, offset));
}

pub fn eligibility(schema: &ResourceSchema, id: Uuid, owner: Uuid) -> Statement {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {}) AS eligible",
        schema.table,
        live_scope(schema)
    );
    Params::scoped(id, owner).finish(sql)
}

pub fn insert(schema: &ResourceSchema, owner: Uuid, fields: &FieldSet) -> Result<Statement, ResourceError> {
    check_writable(schema, fields)?;
    if fields.contains(schema.owner_column) {
        return Err(ResourceError::InvalidColumn {
            resource: schema.name,
            column: schema.owner_column.to_string(),
        });
    }

    let mut params = Params::new();
    params.push(owner);
    let parts = fields.insert_parts(params.len())?;
    params.values.extend(parts.params);

    let sql = format!(
        "INSERT INTO {} ({}, {}) VALUES ($1, {}) RETURNING {}",
        schema.table,
        schema.owner_column,
        parts.columns.join(", "),
        parts.placeholders.join(", "),
        schema.columns
    );
    Ok(params.finish(sql))
}

pub fn select_one(schema: &ResourceSchema, id: Uuid, owner: Uuid) -> Statement {
    let sql = format!("SELECT {} FROM {} WHERE {}", schema.columns, schema.table, live_scope(schema));
    Params::scoped(id, owner).finish(sql)
}

pub fn list(
    schema: &ResourceSchema,
    owner: Uuid,
    filters: &[(&'static str, FieldValue)],
    page: Page,
) -> Result<Statement, ResourceError> {
    let mut params = Params::new();
    let owner_param = params.push(owner);
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = {} AND deleted_at IS NULL",
        schema.columns, schema.table, schema.owner_column, owner_param
    );

    for (column, value) in filters {
        if !schema.is_filterable(column) {
            return Err(ResourceError::InvalidColumn {
                resource: schema.name,
                column: column.to_string(),
            });
        }
        let placeholder = params.push(value.clone());
        sql.push_str(&format!(" AND {} = {}", column, placeholder));
    }

    paging(&mut sql, schema, &mut params, page);
    Ok(params.finish(sql))
}

/// Case-insensitive substring match of `query` across the schema's search columns
pub fn search_text(schema: &ResourceSchema, owner: Uuid, query: &str, page: Page) -> Statement {
    let mut params = Params::new();
    let owner_param = params.push(owner);
    let pattern = params.push(format!("%{}%", escape_like(query)));

    let matches: Vec<String> = schema
        .search_columns
        .iter()
        .map(|column| format!("{}::text ILIKE {}", column, pattern))
        .collect();

    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = {} AND deleted_at IS NULL AND ({})",
        schema.columns,
        schema.table,
        schema.owner_column,
        owner_param,
        matches.join(" OR ")
    );
    paging(&mut sql, schema, &mut params, page);
    params.finish(sql)
}

/// Field search. Strict mode ANDs the supplied fields with exact matching;
/// loose mode ORs every field, guarding absent ones with `IS NOT NULL`.
pub fn search_fields(
    schema: &ResourceSchema,
    owner: Uuid,
    criteria: &[FieldCriterion],
    mode: SearchMode,
    page: Page,
) -> Result<Statement, ResourceError> {
    if criteria.iter().all(|criterion| criterion.value.is_none()) {
        return Err(ResourceError::NoSearchCriteria);
    }

    let mut params = Params::new();
    let owner_param = params.push(owner);

    let predicates: Vec<String> = match mode {
        SearchMode::Strict => criteria
            .iter()
            .filter_map(|criterion| {
                let value = criterion.value.as_deref()?;
                Some(match criterion.kind {
                    MatchKind::Text => {
                        let p = params.push(escape_like(value));
                        format!("{} ILIKE {}", criterion.column, p)
                    }
                    MatchKind::Email => {
                        let p = params.push(value);
                        format!("{} = {}::citext", criterion.column, p)
                    }
                })
            })
            .collect(),
        SearchMode::Loose => criteria
            .iter()
            .map(|criterion| match criterion.kind {
                MatchKind::Text => {
                    let pattern = criterion.value.as_deref().map(|v| format!("%{}%", escape_like(v)));
                    let p = params.push(FieldValue::Text(pattern));
                    format!("({p}::text IS NOT NULL AND {} ILIKE {p})", criterion.column)
                }
                MatchKind::Email => {
                    let p = params.push(FieldValue::Text(criterion.value.clone()));
                    format!("({p}::text IS NOT NULL AND {} = {p}::citext)", criterion.column)
                }
            })
            .collect(),
    };

    let joiner = match mode {
        SearchMode::Strict => " AND ",
        SearchMode::Loose => " OR ",
    };

    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = {} AND deleted_at IS NULL AND ({})",
        schema.columns,
        schema.table,
        schema.owner_column,
        owner_param,
        predicates.join(joiner)
    );
    paging(&mut sql, schema, &mut params, page);
    Ok(params.finish(sql))
}

pub fn update(schema: &ResourceSchema, id: Uuid, owner: Uuid, fields: &FieldSet) -> Result<Statement, ResourceError> {
    check_writable(schema, fields)?;

    let mut params = Params::scoped(id, owner);
    let assignments = fields.assignments(params.len())?;
    params.values.extend(assignments.params);

    let sql = format!(
        "UPDATE {} SET {}, updated_at = now() WHERE {} RETURNING {}",
        schema.table,
        assignments.fragments.join(", "),
        live_scope(schema),
        schema.columns
    );
    Ok(params.finish(sql))
}

pub fn transition(
    schema: &ResourceSchema,
    id: Uuid,
    owner: Uuid,
    transition: &Transition,
) -> Result<Statement, ResourceError> {
    check_writable(schema, &transition.fields)?;

    let mut params = Params::scoped(id, owner);
    let mut fragments = Vec::new();

    if let Some(to) = transition.to {
        fragments.push(format!("status = {}", params.push(to.as_str())));
    }
    if !transition.fields.is_empty() {
        let assignments = transition.fields.assignments(params.len())?;
        params.values.extend(assignments.params);
        fragments.extend(assignments.fragments);
    }
    if fragments.is_empty() {
        return Err(ResourceError::NoFieldsToUpdate);
    }

    let mut predicate = live_scope(schema);
    if !transition.from.is_empty() {
        let allowed: Vec<String> = transition
            .from
            .iter()
            .map(|status| params.push(status.as_str()))
            .collect();
        predicate.push_str(&format!(" AND status IN ({})", allowed.join(", ")));
    }
    for column in transition.require_null {
        predicate.push_str(&format!(" AND {} IS NULL", column));
    }

    let sql = format!(
        "UPDATE {} SET {}, updated_at = now() WHERE {} RETURNING {}",
        schema.table,
        fragments.join(", "),
        predicate,
        schema.columns
    );
    Ok(params.finish(sql))
}

pub fn soft_delete(schema: &ResourceSchema, id: Uuid, owner: Uuid, reason: Option<&str>) -> Statement {
    let mut params = Params::scoped(id, owner);
    let reason = params.push(FieldValue::Text(reason.map(str::to_string)));
    let sql = format!(
        "UPDATE {} SET deleted_by = $2, deleted_at = now(), updated_at = now(), delete_reason = {} \
         WHERE {} RETURNING id, deleted_at",
        schema.table,
        reason,
        live_scope(schema)
    );
    params.finish(sql)
}

pub fn hard_delete(schema: &ResourceSchema, id: Uuid, owner: Uuid) -> Statement {
    let sql = format!("DELETE FROM {} WHERE {} RETURNING id", schema.table, live_scope(schema));
    Params::scoped(id, owner).finish(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Status;

    static WIDGETS: ResourceSchema = ResourceSchema {
        name: "widget",
        table: "widgets.widget_list",
        owner_column: "agent_id",
        columns: "id, agent_id, label, email, status",
        writable: &["agent_id", "label", "email", "checked_at", "checked_by"],
        order_by: "created_at DESC",
        search_columns: &["label", "email"],
        filter_columns: &["label"],
    };

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn eligibility_checks_owner_and_liveness() {
        let (id, owner) = ids();
        let stmt = eligibility(&WIDGETS, id, owner);
        assert_eq!(
            stmt.sql,
            "SELECT EXISTS(SELECT 1 FROM widgets.widget_list WHERE id = $1 AND agent_id = $2 AND deleted_at IS NULL) AS eligible"
        );
        assert_eq!(stmt.params, vec![FieldValue::from(id), FieldValue::from(owner)]);
    }

    #[test]
    fn update_numbers_fields_after_id_and_owner() {
        let (id, owner) = ids();
        let mut fields = FieldSet::new();
        fields.set("label", "blue").set("email", "a@b.co");

        let stmt = update(&WIDGETS, id, owner, &fields).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE widgets.widget_list SET label = $3, email = $4, updated_at = now() \
             WHERE id = $1 AND agent_id = $2 AND deleted_at IS NULL RETURNING id, agent_id, label, email, status"
        );
        assert_eq!(stmt.params.len(), 4);
    }

    #[test]
    fn update_with_no_fields_is_rejected() {
        let (id, owner) = ids();
        let result = update(&WIDGETS, id, owner, &FieldSet::new());
        assert!(matches!(result, Err(ResourceError::NoFieldsToUpdate)));
    }

    #[test]
    fn update_rejects_unknown_columns() {
        let (id, owner) = ids();
        let mut fields = FieldSet::new();
        fields.set("deleted_at", None::<String>);

        match update(&WIDGETS, id, owner, &fields) {
            Err(ResourceError::InvalidColumn { column, .. }) => assert_eq!(column, "deleted_at"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn insert_puts_owner_first() {
        let owner = Uuid::new_v4();
        let mut fields = FieldSet::new();
        fields.set("label", "red");

        let stmt = insert(&WIDGETS, owner, &fields).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO widgets.widget_list (agent_id, label) VALUES ($1, $2) RETURNING id, agent_id, label, email, status"
        );
        assert_eq!(stmt.params[0], FieldValue::from(owner));
    }

    #[test]
    fn insert_refuses_owner_in_field_set() {
        let owner = Uuid::new_v4();
        let mut fields = FieldSet::new();
        fields.set("agent_id", Uuid::new_v4());
        assert!(matches!(insert(&WIDGETS, owner, &fields), Err(ResourceError::InvalidColumn { .. })));
    }

    #[test]
    fn list_applies_filters_then_fixed_order() {
        let owner = Uuid::new_v4();
        let stmt = list(&WIDGETS, owner, &[("label", FieldValue::from("red"))], Page::new(20, 40)).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, agent_id, label, email, status FROM widgets.widget_list \
             WHERE agent_id = $1 AND deleted_at IS NULL AND label = $2 \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        assert_eq!(stmt.params[2], FieldValue::Int(Some(20)));
        assert_eq!(stmt.params[3], FieldValue::Int(Some(40)));
    }

    #[test]
    fn list_rejects_unfilterable_columns() {
        let owner = Uuid::new_v4();
        let result = list(&WIDGETS, owner, &[("email", FieldValue::from("x"))], Page::new(20, 0));
        assert!(matches!(result, Err(ResourceError::InvalidColumn { .. })));
    }

    #[test]
    fn text_search_escapes_wildcards() {
        let owner = Uuid::new_v4();
        let stmt = search_text(&WIDGETS, owner, "50%_off", Page::new(10, 0));
        assert!(stmt.sql.contains("(label::text ILIKE $2 OR email::text ILIKE $2)"));
        assert_eq!(stmt.params[1], FieldValue::Text(Some("%50\\%\\_off%".to_string())));
    }

    #[test]
    fn strict_search_ands_supplied_fields_only() {
        let owner = Uuid::new_v4();
        let criteria = vec![
            FieldCriterion::text("label", Some("Blue".to_string())),
            FieldCriterion::text("other", None),
            FieldCriterion::email("email", Some("A@B.co".to_string())),
        ];

        let stmt = search_fields(&WIDGETS, owner, &criteria, SearchMode::Strict, Page::new(20, 0)).unwrap();
        assert!(stmt.sql.contains("AND (label ILIKE $2 AND email = $3::citext)"));
        assert_eq!(stmt.params.len(), 5);
    }

    #[test]
    fn loose_search_ors_every_field_with_null_guards() {
        let owner = Uuid::new_v4();
        let criteria = vec![
            FieldCriterion::text("label", None),
            FieldCriterion::email("email", Some("a@b.co".to_string())),
        ];

        let stmt = search_fields(&WIDGETS, owner, &criteria, SearchMode::Loose, Page::new(20, 0)).unwrap();
        assert!(stmt.sql.contains(
            "(($2::text IS NOT NULL AND label ILIKE $2) OR ($3::text IS NOT NULL AND email = $3::citext))"
        ));
        assert_eq!(stmt.params[1], FieldValue::Text(None));
    }

    #[test]
    fn field_search_needs_a_value() {
        let owner = Uuid::new_v4();
        let criteria = vec![FieldCriterion::text("label", None)];
        let result = search_fields(&WIDGETS, owner, &criteria, SearchMode::Loose, Page::new(20, 0));
        assert!(matches!(result, Err(ResourceError::NoSearchCriteria)));
    }

    #[test]
    fn verify_transition_requires_inactive() {
        let (id, owner) = ids();
        let stmt = transition(&WIDGETS, id, owner, &Transition::verify()).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE widgets.widget_list SET status = $3, updated_at = now() \
             WHERE id = $1 AND agent_id = $2 AND deleted_at IS NULL AND status IN ($4) \
             RETURNING id, agent_id, label, email, status"
        );
        assert_eq!(stmt.params[2], FieldValue::from("Active"));
        assert_eq!(stmt.params[3], FieldValue::from("Inactive"));
    }

    #[test]
    fn transition_with_fields_and_null_guard() {
        let (id, owner) = ids();
        let mut fields = FieldSet::new();
        fields.set("checked_by", owner);
        let step = Transition {
            from: &[Status::Inactive],
            to: None,
            fields,
            require_null: &["checked_at"],
        };

        let stmt = transition(&WIDGETS, id, owner, &step).unwrap();
        assert!(stmt.sql.starts_with("UPDATE widgets.widget_list SET checked_by = $3, updated_at = now()"));
        assert!(stmt.sql.contains("AND status IN ($4) AND checked_at IS NULL"));
    }

    #[test]
    fn soft_delete_records_actor_and_reason() {
        let (id, owner) = ids();
        let stmt = soft_delete(&WIDGETS, id, owner, Some("duplicate"));
        assert_eq!(
            stmt.sql,
            "UPDATE widgets.widget_list SET deleted_by = $2, deleted_at = now(), updated_at = now(), delete_reason = $3 \
             WHERE id = $1 AND agent_id = $2 AND deleted_at IS NULL RETURNING id, deleted_at"
        );
        assert_eq!(stmt.params[2], FieldValue::from("duplicate"));
    }

    #[test]
    fn hard_delete_only_removes_live_owned_rows() {
        let (id, owner) = ids();
        let stmt = hard_delete(&WIDGETS, id, owner);
        assert_eq!(
            stmt.sql,
            "DELETE FROM widgets.widget_list WHERE id = $1 AND agent_id = $2 AND deleted_at IS NULL RETURNING id"
        );
    }
}
