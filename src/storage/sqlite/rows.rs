//! Row decoding for the SQLite store.

use chrono::{DateTime, FixedOffset, NaiveDate};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::model::{
    AttendanceEntry, AttendanceStatus, Event, Genre, ParticipationCounters,
    ParticipationHistoryRecord, PointBalance, PointLedgerRecord,
};
use crate::storage::{Result, StorageError};

pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";

fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<FixedOffset>> {
    let raw: String = row.try_get(column)?;
    Ok(DateTime::parse_from_rfc3339(&raw)?)
}

fn status(raw: String) -> Result<AttendanceStatus> {
    raw.parse().map_err(|_| StorageError::InvalidValue {
        column: "status",
        value: raw,
    })
}

pub(super) fn event(row: &SqliteRow) -> Result<Event> {
    let genre: String = row.try_get("genre")?;
    Ok(Event {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        genre: Genre::from_flag(&genre),
        start_at: row.try_get("start_at")?,
    })
}

pub(super) fn entry(row: &SqliteRow) -> Result<AttendanceEntry> {
    Ok(AttendanceEntry {
        event_id: row.try_get("event_id")?,
        employee_id: row.try_get("employee_id")?,
        status: status(row.try_get("status")?)?,
    })
}

pub(super) fn history(row: &SqliteRow) -> Result<ParticipationHistoryRecord> {
    let date: String = row.try_get("participation_date")?;
    Ok(ParticipationHistoryRecord {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        event_id: row.try_get("event_id")?,
        participation_date: NaiveDate::parse_from_str(&date, DATE_FORMAT)?,
    })
}

pub(super) fn ledger(row: &SqliteRow) -> Result<PointLedgerRecord> {
    Ok(PointLedgerRecord {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        delta: row.try_get("delta")?,
        reason: row.try_get("reason")?,
        event_id: row.try_get("event_id")?,
        actor_id: row.try_get("actor_id")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(super) fn counters(row: &SqliteRow) -> Result<ParticipationCounters> {
    Ok(ParticipationCounters {
        employee_id: row.try_get("employee_id")?,
        official_count: row.try_get("official_count")?,
        unofficial_count: row.try_get("unofficial_count")?,
        last_updated: timestamp(row, "last_updated")?,
    })
}

pub(super) fn balance(row: &SqliteRow) -> Result<PointBalance> {
    Ok(PointBalance {
        employee_id: row.try_get("employee_id")?,
        total_points: row.try_get("total_points")?,
        last_updated: timestamp(row, "last_updated")?,
        last_updated_by: row.try_get("last_updated_by")?,
    })
}

/// Map a unique-constraint violation to `DuplicateKey`, pass others through.
pub(super) fn duplicate_as(
    table: &'static str,
    key: impl FnOnce() -> String,
) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |e| {
        let unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
        if unique {
            StorageError::DuplicateKey { table, key: key() }
        } else {
            StorageError::Database(e)
        }
    }
}
