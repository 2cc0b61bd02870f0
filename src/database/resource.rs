use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use crate::database::field_set::FieldSet;
use crate::database::models::Status;

/// Static description of one owner-scoped resource table
#[derive(Debug)]
pub struct ResourceSchema {
    /// Singular name used in logs and error messages
    pub name: &'static str,
    /// Schema-qualified table name
    pub table: &'static str,
    pub owner_column: &'static str,
    /// Select list used for reads and RETURNING clauses
    pub columns: &'static str,
    /// Columns a FieldSet may assign
    pub writable: &'static [&'static str],
    /// Fixed listing order, newest first. `id DESC` is appended as the final tie breaker.
    pub order_by: &'static str,
    /// Columns scanned by free-text search
    pub search_columns: &'static [&'static str],
    /// Columns accepted as equality filters on listings
    pub filter_columns: &'static [&'static str],
}

impl ResourceSchema {
    pub fn is_writable(&self, column: &str) -> bool {
        self.writable.contains(&column)
    }

    pub fn is_filterable(&self, column: &str) -> bool {
        self.filter_columns.contains(&column)
    }
}

/// A row type backed by a `ResourceSchema`
pub trait Resource: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static {
    const SCHEMA: &'static ResourceSchema;

    fn id(&self) -> Uuid;

    /// Value of `SCHEMA.owner_column`
    fn owner(&self) -> Uuid;
}

/// A guarded status change. The row must currently hold one of `from`, and every
/// column in `require_null` must still be NULL.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: &'static [Status],
    pub to: Option<Status>,
    pub fields: FieldSet,
    pub require_null: &'static [&'static str],
}

impl Transition {
    /// Inactive -> Active
    pub fn verify() -> Self {
        Self {
            from: &[Status::Inactive],
            to: Some(Status::Active),
            fields: FieldSet::new(),
            require_null: &[],
        }
    }

    /// Inactive or Active -> Disabled
    pub fn disable() -> Self {
        Self {
            from: &[Status::Inactive, Status::Active],
            to: Some(Status::Disabled),
            fields: FieldSet::new(),
            require_null: &[],
        }
    }

    /// Disabled -> Active
    pub fn enable() -> Self {
        Self {
            from: &[Status::Disabled],
            to: Some(Status::Active),
            fields: FieldSet::new(),
            require_null: &[],
        }
    }

    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = fields;
        self
    }

    pub fn requiring_null(mut self, columns: &'static [&'static str]) -> Self {
        self.require_null = columns;
        self
    }
}
