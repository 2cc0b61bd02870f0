use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owns the process-wide connection pool. Built once by the entry point and
/// handed to the router state; closed on shutdown.
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Connects eagerly, failing fast when the database is unreachable
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = Self::connection_string(config)?;
        let pool = Self::pool_options(config).connect(&url).await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Builds the pool without opening a connection; the first query connects
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = Self::connection_string(config)?;
        let pool = Self::pool_options(config).connect_lazy(&url)?;
        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
    }

    fn connection_string(config: &DatabaseConfig) -> Result<String, DatabaseError> {
        let raw = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        match url.scheme() {
            "postgres" | "postgresql" => Ok(url.into()),
            _ => Err(DatabaseError::InvalidDatabaseUrl),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations in `migrations/`
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        health_check(&self.pool).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
