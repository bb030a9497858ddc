//! Storage implementations.
//!
//! The [`AttendanceStore`] trait is the table-oriented persistence collaborator
//! the confirmation procedure and the point operations talk to.
//!
//! Implementations:
//! - `InMemoryStore`: process-local tables, with failure injection for tests
//! - `SqliteStore`: SQLite storage (feature `sqlite`)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::model::{
    AttendanceEntry, AttendanceStatus, Event, Genre, ParticipationCounters,
    ParticipationHistoryRecord, PointBalance, PointLedgerRecord,
};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{InMemoryStore, StoreOp};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("Row not found in {table}: {key}")]
    NotFound { table: &'static str, key: String },

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Injected failure on {0}")]
    Injected(StoreOp),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Interface for attendance and point persistence.
///
/// Every method is a single round-trip against the store. Sequence ids for
/// the history and ledger tables are assigned by the caller from
/// `max_*_id`; the store only rejects duplicates.
///
/// Counter and balance updates are single atomic increments: the store
/// computes `total + delta` itself, so two concurrent callers never lose an
/// update.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    // --- Events ---

    async fn put_event(&self, event: &Event) -> Result<()>;

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>>;

    // --- Attendance entries ---

    /// Insert or replace the status of one employee on one event.
    async fn upsert_entry(
        &self,
        event_id: &str,
        employee_id: &str,
        status: AttendanceStatus,
    ) -> Result<()>;

    async fn get_entry(&self, event_id: &str, employee_id: &str)
        -> Result<Option<AttendanceEntry>>;

    /// All entries for an event, ordered by employee id.
    async fn list_entries(&self, event_id: &str) -> Result<Vec<AttendanceEntry>>;

    /// Employee ids with `provisional-attend` on this event, ordered by id.
    async fn provisional_attendees(&self, event_id: &str) -> Result<Vec<String>>;

    /// Batched status update filtered by event id and the employee id set.
    ///
    /// Returns the number of rows changed.
    async fn set_status(
        &self,
        event_id: &str,
        employee_ids: &[String],
        status: AttendanceStatus,
    ) -> Result<u64>;

    // --- Participation history ---

    async fn max_history_id(&self) -> Result<Option<i64>>;

    /// Bulk insert. All-or-nothing per call.
    async fn insert_history(&self, rows: &[ParticipationHistoryRecord]) -> Result<()>;

    async fn delete_history(&self, ids: &[i64]) -> Result<()>;

    async fn history_for_event(&self, event_id: &str) -> Result<Vec<ParticipationHistoryRecord>>;

    // --- Point ledger ---

    async fn max_ledger_id(&self) -> Result<Option<i64>>;

    /// Bulk insert. All-or-nothing per call.
    async fn insert_ledger(&self, rows: &[PointLedgerRecord]) -> Result<()>;

    async fn delete_ledger(&self, ids: &[i64]) -> Result<()>;

    async fn ledger_for_employee(&self, employee_id: &str) -> Result<Vec<PointLedgerRecord>>;

    // --- Participation counters ---

    async fn participation_counters(&self, employee_id: &str)
        -> Result<Option<ParticipationCounters>>;

    /// Add `delta` to the counter selected by `genre`, creating the row with
    /// zeroed counters first when absent.
    async fn add_participation(
        &self,
        employee_id: &str,
        genre: Genre,
        delta: i64,
        at: DateTime<FixedOffset>,
    ) -> Result<ParticipationCounters>;

    // --- Point balances ---

    async fn point_balance(&self, employee_id: &str) -> Result<Option<PointBalance>>;

    /// Add `delta` to the running total, creating the row at zero first when
    /// absent.
    async fn add_points(
        &self,
        employee_id: &str,
        delta: i64,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<PointBalance>;

    /// Subtract `amount` only if the current total covers it.
    ///
    /// Returns `None`, changing nothing, when the balance is missing or too
    /// small.
    async fn try_debit_points(
        &self,
        employee_id: &str,
        amount: i64,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<PointBalance>>;
}

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn AttendanceStore>, Box<dyn std::error::Error>> {
    info!(storage = %config.storage_type, "Initializing storage");

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(InMemoryStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let store = SqliteStore::connect(&config.sqlite).await?;
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
    }
}
