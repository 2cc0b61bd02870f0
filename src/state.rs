use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::database::{Resource, ResourceStore};
use crate::identity::IdentityProvider;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: PgPool,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config: Arc::new(config),
            pool,
            identity,
        }
    }

    pub fn store<R: Resource>(&self) -> ResourceStore<R> {
        ResourceStore::new(self.pool.clone()).with_statement_logging(self.config.database.enable_query_logging)
    }
}
