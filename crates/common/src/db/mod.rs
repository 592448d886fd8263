//! Database layer for Agora
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management with a retried initial connect
//! - Embedded schema migrations

pub mod models;
mod repository;

pub use repository::{
    NewComment, NewPaper, NewReview, NewSharedLink, PaperFilter, PaperRecord, Repository, TrendingFilter,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use backoff::{future::retry, ExponentialBackoff};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Database connection pool wrapper; connections are shared behind `Arc`
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: Arc<DatabaseConnection>,

    /// Read replica connection (optional)
    pub replica: Option<Arc<DatabaseConnection>>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");
        let primary = connect_with_retry("primary", &config.url, config).await?;

        let replica = match config.read_url {
            Some(ref read_url) => {
                info!("Connecting to read replica...");
                Some(Arc::new(connect_with_retry("replica", read_url, config).await?))
            }
            None => None,
        };

        info!("Database connections established");

        Ok(Self {
            primary: Arc::new(primary),
            replica,
        })
    }

    /// Wrap an existing connection, used for both reads and writes
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self {
            primary: Arc::new(primary),
            replica: None,
        }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_deref().unwrap_or(self.primary.as_ref())
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        self.primary.as_ref()
    }

    /// Apply any pending migrations from `migrations/` on the primary
    pub async fn run_migrations(&self) -> Result<()> {
        let pool = self.primary.get_postgres_connection_pool();
        migrator().run(pool).await.map_err(|e| AppError::Configuration {
            message: format!("Migration failed: {}", e),
        })?;

        info!(applied = migrator().iter().count(), "Schema migrations up to date");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

/// Migrations embedded at compile time
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);
    opts
}

/// Connect, retrying with exponential backoff until the retry budget runs out
async fn connect_with_retry(
    role: &'static str,
    url: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(config.connect_retry_budget_secs)),
        ..Default::default()
    };

    retry(policy, || async {
        Database::connect(connect_options(url, config))
            .await
            .map_err(|e: DbErr| {
                warn!(role, error = %e, "Database connection attempt failed, retrying");
                backoff::Error::transient(e)
            })
    })
    .await
    .map_err(|e| AppError::DatabaseConnection {
        message: format!("Failed to connect to {}: {}", role, e),
    })
}
