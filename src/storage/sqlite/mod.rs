//! SQLite implementation of the attendance store.

mod attendance_store;
mod rows;

use std::time::Duration;

use backon::Retryable;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::SqliteConfig;
use crate::storage::schema::ALL_TABLES;
use crate::storage::Result;
use crate::utils::retry::storage_backoff;

/// SQLite implementation of AttendanceStore.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database, retrying transient connection failures.
    pub async fn connect(config: &SqliteConfig) -> Result<Self> {
        if !config.is_in_memory() {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let url = config.url();
        let url = url.as_str();
        let pool = (move || pool_options(config).connect(url))
            .retry(storage_backoff())
            .when(|e: &sqlx::Error| matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut))
            .notify(|e: &sqlx::Error, delay: Duration| {
                warn!(error = %e, ?delay, "SQLite connection failed, retrying");
            })
            .await?;

        info!(path = %config.path, "Connected to SQLite");
        Ok(Self::new(pool))
    }

    /// Create all tables if they do not exist yet.
    pub async fn init(&self) -> Result<()> {
        for ddl in ALL_TABLES {
            sqlx::raw_sql(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn pool_options(config: &SqliteConfig) -> SqlitePoolOptions {
    if config.is_in_memory() {
        // Every connection to `sqlite::memory:` is a separate database.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    }
}
