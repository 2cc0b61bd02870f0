use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::error::ResourceError;
use crate::database::field_set::{FieldSet, FieldValue};
use crate::database::models::Deleted;
use crate::database::resource::{Resource, Transition};
use crate::database::statements::{self, FieldCriterion, Page, SearchMode, Statement};

/// Outcome of a partial update. An empty patch is a successful no-op.
#[derive(Debug)]
pub enum UpdateOutcome<T> {
    Updated(T),
    NoOp,
}

impl<T> UpdateOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            UpdateOutcome::Updated(value) => Some(value),
            UpdateOutcome::NoOp => None,
        }
    }
}

/// A mutation that has executed but not committed.
///
/// Dropping it rolls the transaction back, so the connection is released on
/// every exit path.
pub struct PendingMutation<T> {
    tx: Transaction<'static, Postgres>,
    value: T,
}

impl<T> PendingMutation<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub async fn commit(self) -> Result<T, ResourceError> {
        self.tx.commit().await?;
        Ok(self.value)
    }

    pub async fn rollback(self) -> Result<(), ResourceError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Owner-scoped data access for one resource type
pub struct ResourceStore<R> {
    pool: PgPool,
    log_statements: bool,
    _phantom: std::marker::PhantomData<R>,
}

impl<R> Clone for ResourceStore<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            log_statements: self.log_statements,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            log_statements: false,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    fn trace(&self, operation: &'static str, statement: &Statement) {
        if self.log_statements {
            debug!(resource = R::SCHEMA.name, operation, sql = %statement.sql, params = statement.params.len(), "executing statement");
        }
    }

    /// Whether `id` exists, is live, and belongs to `owner`. Connection and
    /// query failures surface as `Infrastructure`, never as `false`.
    pub async fn is_owned(&self, id: Uuid, owner: Uuid) -> Result<bool, ResourceError> {
        let statement = statements::eligibility(R::SCHEMA, id, owner);
        self.trace("eligibility", &statement);
        let eligible = statement.query_scalar::<bool>().fetch_one(&self.pool).await?;
        Ok(eligible)
    }

    async fn ensure_owned(&self, id: Uuid, owner: Uuid) -> Result<(), ResourceError> {
        if self.is_owned(id, owner).await? {
            return Ok(());
        }
        warn!(resource = R::SCHEMA.name, %id, %owner, "ownership check failed");
        Err(ResourceError::NotEligible { resource: R::SCHEMA.name })
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, ResourceError> {
        Ok(self.pool.begin().await?)
    }

    /// Runs a RETURNING statement inside `tx`; zero rows means the predicate went stale
    async fn fetch_mutated<T>(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        operation: &'static str,
        statement: &Statement,
    ) -> Result<T, ResourceError>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        self.trace(operation, statement);
        statement
            .query_as::<T>()
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(ResourceError::NoRowsAffected { resource: R::SCHEMA.name })
    }

    pub async fn begin_create(&self, owner: Uuid, fields: FieldSet) -> Result<PendingMutation<R>, ResourceError> {
        let statement = statements::insert(R::SCHEMA, owner, &fields)?;
        let mut tx = self.begin().await?;
        self.trace("create", &statement);
        let value = statement.query_as::<R>().fetch_one(&mut *tx).await?;
        Ok(PendingMutation { tx, value })
    }

    pub async fn create(&self, owner: Uuid, fields: FieldSet) -> Result<R, ResourceError> {
        self.begin_create(owner, fields).await?.commit().await
    }

    pub async fn get(&self, id: Uuid, owner: Uuid) -> Result<R, ResourceError> {
        let statement = statements::select_one(R::SCHEMA, id, owner);
        self.trace("get", &statement);
        statement
            .query_as::<R>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ResourceError::NotFound { resource: R::SCHEMA.name })
    }

    pub async fn list(
        &self,
        owner: Uuid,
        filters: &[(&'static str, FieldValue)],
        page: Page,
    ) -> Result<Vec<R>, ResourceError> {
        let statement = statements::list(R::SCHEMA, owner, filters, page)?;
        self.trace("list", &statement);
        Ok(statement.query_as::<R>().fetch_all(&self.pool).await?)
    }

    pub async fn search(&self, owner: Uuid, query: &str, page: Page) -> Result<Vec<R>, ResourceError> {
        let statement = statements::search_text(R::SCHEMA, owner, query, page);
        self.trace("search", &statement);
        Ok(statement.query_as::<R>().fetch_all(&self.pool).await?)
    }

    pub async fn search_fields(
        &self,
        owner: Uuid,
        criteria: &[FieldCriterion],
        mode: SearchMode,
        page: Page,
    ) -> Result<Vec<R>, ResourceError> {
        let statement = statements::search_fields(R::SCHEMA, owner, criteria, mode, page)?;
        self.trace("search_fields", &statement);
        Ok(statement.query_as::<R>().fetch_all(&self.pool).await?)
    }

    /// Guard, then apply `fields`. An empty field set returns `NoOp` without
    /// opening a transaction.
    pub async fn begin_update(
        &self,
        id: Uuid,
        owner: Uuid,
        fields: FieldSet,
    ) -> Result<UpdateOutcome<PendingMutation<R>>, ResourceError> {
        self.ensure_owned(id, owner).await?;

        let statement = match statements::update(R::SCHEMA, id, owner, &fields) {
            Ok(statement) => statement,
            Err(ResourceError::NoFieldsToUpdate) => return Ok(UpdateOutcome::NoOp),
            Err(err) => return Err(err),
        };

        let mut tx = self.begin().await?;
        let value = self.fetch_mutated(&mut tx, "update", &statement).await?;
        Ok(UpdateOutcome::Updated(PendingMutation { tx, value }))
    }

    pub async fn update(&self, id: Uuid, owner: Uuid, fields: FieldSet) -> Result<UpdateOutcome<R>, ResourceError> {
        match self.begin_update(id, owner, fields).await? {
            UpdateOutcome::Updated(pending) => Ok(UpdateOutcome::Updated(pending.commit().await?)),
            UpdateOutcome::NoOp => Ok(UpdateOutcome::NoOp),
        }
    }

    /// Applies more assignments to a row already modified inside `pending`
    pub async fn update_within(&self, pending: &mut PendingMutation<R>, fields: FieldSet) -> Result<(), ResourceError> {
        let statement = statements::update(R::SCHEMA, pending.value.id(), pending.value.owner(), &fields)?;
        pending.value = self.fetch_mutated(&mut pending.tx, "update", &statement).await?;
        Ok(())
    }

    pub async fn begin_transition(
        &self,
        id: Uuid,
        owner: Uuid,
        transition: &Transition,
    ) -> Result<PendingMutation<R>, ResourceError> {
        self.ensure_owned(id, owner).await?;

        let statement = statements::transition(R::SCHEMA, id, owner, transition)?;
        let mut tx = self.begin().await?;
        let value = self.fetch_mutated(&mut tx, "transition", &statement).await?;
        Ok(PendingMutation { tx, value })
    }

    pub async fn transition(&self, id: Uuid, owner: Uuid, transition: &Transition) -> Result<R, ResourceError> {
        self.begin_transition(id, owner, transition).await?.commit().await
    }

    /// Inactive -> Active
    pub async fn verify(&self, id: Uuid, owner: Uuid) -> Result<R, ResourceError> {
        self.transition(id, owner, &Transition::verify()).await
    }

    pub async fn begin_soft_delete(
        &self,
        id: Uuid,
        owner: Uuid,
        reason: Option<&str>,
    ) -> Result<PendingMutation<Deleted>, ResourceError> {
        self.ensure_owned(id, owner).await?;

        let statement = statements::soft_delete(R::SCHEMA, id, owner, reason);
        let mut tx = self.begin().await?;
        let value = self.fetch_mutated(&mut tx, "soft_delete", &statement).await?;
        Ok(PendingMutation { tx, value })
    }

    pub async fn soft_delete(&self, id: Uuid, owner: Uuid, reason: Option<&str>) -> Result<Deleted, ResourceError> {
        self.begin_soft_delete(id, owner, reason).await?.commit().await
    }

    /// Physically removes the row. Callers gate this behind configuration.
    pub async fn hard_delete(&self, id: Uuid, owner: Uuid) -> Result<Uuid, ResourceError> {
        self.ensure_owned(id, owner).await?;

        let statement = statements::hard_delete(R::SCHEMA, id, owner);
        let mut tx = self.begin().await?;
        self.trace("hard_delete", &statement);
        let deleted = statement
            .query_scalar::<Uuid>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ResourceError::NotFound { resource: R::SCHEMA.name })?;
        tx.commit().await?;

        warn!(resource = R::SCHEMA.name, id = %deleted, "row permanently deleted");
        Ok(deleted)
    }
}

/// Serializable page of results
#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}

impl<T: Serialize> Listing<T> {
    pub fn new(items: Vec<T>, page: Page) -> Self {
        Self { items, limit: page.limit, offset: page.offset }
    }
}
