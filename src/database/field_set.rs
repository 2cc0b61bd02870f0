use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use crate::database::error::ResourceError;

/// A typed SQL parameter. `None` binds a typed NULL so columns can be cleared.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Bool(Option<bool>),
    Int(Option<i64>),
    Decimal(Option<Decimal>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.is_none(),
            FieldValue::Uuid(v) => v.is_none(),
            FieldValue::Bool(v) => v.is_none(),
            FieldValue::Int(v) => v.is_none(),
            FieldValue::Decimal(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
            FieldValue::Timestamp(v) => v.is_none(),
        }
    }
}

macro_rules! field_value_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::$variant(Some(value))
            }
        }

        impl From<Option<$ty>> for FieldValue {
            fn from(value: Option<$ty>) -> Self {
                FieldValue::$variant(value)
            }
        }
    };
}

field_value_from!(String, Text);
field_value_from!(Uuid, Uuid);
field_value_from!(bool, Bool);
field_value_from!(i64, Int);
field_value_from!(Decimal, Decimal);
field_value_from!(NaiveDate, Date);
field_value_from!(DateTime<Utc>, Timestamp);

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(Some(value.to_string()))
    }
}

/// Ordered column assignments for a partial write.
///
/// Columns keep the order in which they were first set, so generated SQL and
/// parameter lists are reproducible. Setting a column twice replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<(&'static str, FieldValue)>,
}

/// `col = $n` fragments with their positionally matched parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Assignments {
    pub fragments: Vec<String>,
    pub params: Vec<FieldValue>,
}

/// Column list, placeholders and parameters for an INSERT
#[derive(Debug, Clone, PartialEq)]
pub struct InsertParts {
    pub columns: Vec<&'static str>,
    pub placeholders: Vec<String>,
    pub params: Vec<FieldValue>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column to a value. An explicit `None` is kept and clears the column.
    pub fn set(&mut self, column: &'static str, value: impl Into<FieldValue>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Sets a column only when a value was supplied. Absent means "leave unchanged".
    pub fn set_if<V: Into<FieldValue>>(&mut self, column: &'static str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, value);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| *name == column)
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| *name == column).map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    /// Builds `col = $n` fragments. `offset` is the number of fixed leading
    /// parameters, so the first fragment uses `$offset + 1`.
    pub fn assignments(&self, offset: usize) -> Result<Assignments, ResourceError> {
        if self.fields.is_empty() {
            return Err(ResourceError::NoFieldsToUpdate);
        }

        let mut fragments = Vec::with_capacity(self.fields.len());
        let mut params = Vec::with_capacity(self.fields.len());
        for (index, (column, value)) in self.fields.iter().enumerate() {
            fragments.push(format!("{} = ${}", column, offset + index + 1));
            params.push(value.clone());
        }

        Ok(Assignments { fragments, params })
    }

    pub fn insert_parts(&self, offset: usize) -> Result<InsertParts, ResourceError> {
        if self.fields.is_empty() {
            return Err(ResourceError::NoFieldsToUpdate);
        }

        let mut parts = InsertParts {
            columns: Vec::with_capacity(self.fields.len()),
            placeholders: Vec::with_capacity(self.fields.len()),
            params: Vec::with_capacity(self.fields.len()),
        };
        for (index, (column, value)) in self.fields.iter().enumerate() {
            parts.columns.push(column);
            parts.placeholders.push(format!("${}", offset + index + 1));
            parts.params.push(value.clone());
        }

        Ok(parts)
    }
}

pub(crate) fn bind_query_as<'q, O>(
    q: QueryAs<'q, Postgres, O, PgArguments>,
    v: &FieldValue,
) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    match v {
        FieldValue::Text(s) => q.bind(s.clone()),
        FieldValue::Uuid(u) => q.bind(*u),
        FieldValue::Bool(b) => q.bind(*b),
        FieldValue::Int(i) => q.bind(*i),
        FieldValue::Decimal(d) => q.bind(*d),
        FieldValue::Date(d) => q.bind(*d),
        FieldValue::Timestamp(t) => q.bind(*t),
    }
}

pub(crate) fn bind_query_scalar<'q, O>(
    q: QueryScalar<'q, Postgres, O, PgArguments>,
    v: &FieldValue,
) -> QueryScalar<'q, Postgres, O, PgArguments>
where
    O: Send + Unpin,
{
    match v {
        FieldValue::Text(s) => q.bind(s.clone()),
        FieldValue::Uuid(u) => q.bind(*u),
        FieldValue::Bool(b) => q.bind(*b),
        FieldValue::Int(i) => q.bind(*i),
        FieldValue::Decimal(d) => q.bind(*d),
        FieldValue::Date(d) => q.bind(*d),
        FieldValue::Timestamp(t) => q.bind(*t),
    }
}
