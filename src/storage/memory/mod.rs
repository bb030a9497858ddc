//! In-memory AttendanceStore.
//!
//! Backs the `memory` storage type and the unit tests. Failure injection
//! lets tests break a specific operation after a number of successful calls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio::sync::RwLock;

use super::{AttendanceStore, Result, StorageError};
use crate::model::{
    AttendanceEntry, AttendanceStatus, Event, Genre, ParticipationCounters,
    ParticipationHistoryRecord, PointBalance, PointLedgerRecord,
};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ProvisionalAttendees,
    SetStatus,
    InsertHistory,
    DeleteHistory,
    InsertLedger,
    DeleteLedger,
    AddParticipation,
    AddPoints,
    DebitPoints,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOp::ProvisionalAttendees => "provisional_attendees",
            StoreOp::SetStatus => "set_status",
            StoreOp::InsertHistory => "insert_history",
            StoreOp::DeleteHistory => "delete_history",
            StoreOp::InsertLedger => "insert_ledger",
            StoreOp::DeleteLedger => "delete_ledger",
            StoreOp::AddParticipation => "add_participation",
            StoreOp::AddPoints => "add_points",
            StoreOp::DebitPoints => "try_debit_points",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Tables {
    events: HashMap<String, Event>,
    entries: BTreeMap<(String, String), AttendanceStatus>,
    history: BTreeMap<i64, ParticipationHistoryRecord>,
    ledger: BTreeMap<i64, PointLedgerRecord>,
    counters: HashMap<String, ParticipationCounters>,
    balances: HashMap<String, PointBalance>,
}

#[derive(Default)]
struct Faults {
    /// Remaining successful calls before the operation starts failing.
    fail_after: HashMap<StoreOp, usize>,
    writes: usize,
}

/// Store that keeps all tables in memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    faults: RwLock<Faults>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail on every call.
    pub async fn fail_on(&self, op: StoreOp) {
        self.fail_after(op, 0).await;
    }

    /// Let `op` succeed `successes` more times, then fail.
    pub async fn fail_after(&self, op: StoreOp, successes: usize) {
        self.faults.write().await.fail_after.insert(op, successes);
    }

    pub async fn clear_failures(&self) {
        self.faults.write().await.fail_after.clear();
    }

    /// Number of successful mutating calls since creation.
    pub async fn write_count(&self) -> usize {
        self.faults.read().await.writes
    }

    async fn check(&self, op: StoreOp) -> Result<()> {
        let mut faults = self.faults.write().await;
        match faults.fail_after.get_mut(&op) {
            Some(0) => Err(StorageError::Injected(op)),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn wrote(&self) {
        self.faults.write().await.writes += 1;
    }
}

#[async_trait]
impl AttendanceStore for InMemoryStore {
    async fn put_event(&self, event: &Event) -> Result<()> {
        self.tables
            .write()
            .await
            .events
            .insert(event.id.clone(), event.clone());
        self.wrote().await;
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(event_id).cloned())
    }

    async fn upsert_entry(
        &self,
        event_id: &str,
        employee_id: &str,
        status: AttendanceStatus,
    ) -> Result<()> {
        self.tables
            .write()
            .await
            .entries
            .insert((event_id.to_string(), employee_id.to_string()), status);
        self.wrote().await;
        Ok(())
    }

    async fn get_entry(
        &self,
        event_id: &str,
        employee_id: &str,
    ) -> Result<Option<AttendanceEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .get(&(event_id.to_string(), employee_id.to_string()))
            .map(|status| AttendanceEntry {
                event_id: event_id.to_string(),
                employee_id: employee_id.to_string(),
                status: *status,
            }))
    }

    async fn list_entries(&self, event_id: &str) -> Result<Vec<AttendanceEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .filter(|((event, _), _)| event == event_id)
            .map(|((event, employee), status)| AttendanceEntry {
                event_id: event.clone(),
                employee_id: employee.clone(),
                status: *status,
            })
            .collect())
    }

    async fn provisional_attendees(&self, event_id: &str) -> Result<Vec<String>> {
        self.check(StoreOp::ProvisionalAttendees).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .filter(|((event, _), status)| {
                event == event_id && **status == AttendanceStatus::ProvisionalAttend
            })
            .map(|((_, employee), _)| employee.clone())
            .collect())
    }

    async fn set_status(
        &self,
        event_id: &str,
        employee_ids: &[String],
        status: AttendanceStatus,
    ) -> Result<u64> {
        self.check(StoreOp::SetStatus).await?;
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for employee_id in employee_ids {
            if let Some(current) = tables
                .entries
                .get_mut(&(event_id.to_string(), employee_id.clone()))
            {
                *current = status;
                changed += 1;
            }
        }
        drop(tables);
        self.wrote().await;
        Ok(changed)
    }

    async fn max_history_id(&self) -> Result<Option<i64>> {
        Ok(self.tables.read().await.history.keys().next_back().copied())
    }

    async fn insert_history(&self, rows: &[ParticipationHistoryRecord]) -> Result<()> {
        self.check(StoreOp::InsertHistory).await?;
        let mut tables = self.tables.write().await;
        if let Some(dup) = rows.iter().find(|r| tables.history.contains_key(&r.id)) {
            return Err(StorageError::DuplicateKey {
                table: "participation_history",
                key: dup.id.to_string(),
            });
        }
        for row in rows {
            tables.history.insert(row.id, row.clone());
        }
        drop(tables);
        self.wrote().await;
        Ok(())
    }

    async fn delete_history(&self, ids: &[i64]) -> Result<()> {
        self.check(StoreOp::DeleteHistory).await?;
        let mut tables = self.tables.write().await;
        for id in ids {
            tables.history.remove(id);
        }
        drop(tables);
        self.wrote().await;
        Ok(())
    }

    async fn history_for_event(&self, event_id: &str) -> Result<Vec<ParticipationHistoryRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn max_ledger_id(&self) -> Result<Option<i64>> {
        Ok(self.tables.read().await.ledger.keys().next_back().copied())
    }

    async fn insert_ledger(&self, rows: &[PointLedgerRecord]) -> Result<()> {
        self.check(StoreOp::InsertLedger).await?;
        let mut tables = self.tables.write().await;
        if let Some(dup) = rows.iter().find(|r| tables.ledger.contains_key(&r.id)) {
            return Err(StorageError::DuplicateKey {
                table: "point_ledger",
                key: dup.id.to_string(),
            });
        }
        for row in rows {
            tables.ledger.insert(row.id, row.clone());
        }
        drop(tables);
        self.wrote().await;
        Ok(())
    }

    async fn delete_ledger(&self, ids: &[i64]) -> Result<()> {
        self.check(StoreOp::DeleteLedger).await?;
        let mut tables = self.tables.write().await;
        for id in ids {
            tables.ledger.remove(id);
        }
        drop(tables);
        self.wrote().await;
        Ok(())
    }

    async fn ledger_for_employee(&self, employee_id: &str) -> Result<Vec<PointLedgerRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn participation_counters(
        &self,
        employee_id: &str,
    ) -> Result<Option<ParticipationCounters>> {
        Ok(self.tables.read().await.counters.get(employee_id).cloned())
    }

    async fn add_participation(
        &self,
        employee_id: &str,
        genre: Genre,
        delta: i64,
        at: DateTime<FixedOffset>,
    ) -> Result<ParticipationCounters> {
        self.check(StoreOp::AddParticipation).await?;
        let mut tables = self.tables.write().await;
        let counters = tables
            .counters
            .entry(employee_id.to_string())
            .or_insert_with(|| ParticipationCounters {
                employee_id: employee_id.to_string(),
                official_count: 0,
                unofficial_count: 0,
                last_updated: at,
            });
        match genre {
            Genre::Official => counters.official_count += delta,
            Genre::Unofficial => counters.unofficial_count += delta,
        }
        counters.last_updated = at;
        let updated = counters.clone();
        drop(tables);
        self.wrote().await;
        Ok(updated)
    }

    async fn point_balance(&self, employee_id: &str) -> Result<Option<PointBalance>> {
        Ok(self.tables.read().await.balances.get(employee_id).cloned())
    }

    async fn add_points(
        &self,
        employee_id: &str,
        delta: i64,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<PointBalance> {
        self.check(StoreOp::AddPoints).await?;
        let mut tables = self.tables.write().await;
        let balance = tables
            .balances
            .entry(employee_id.to_string())
            .or_insert_with(|| PointBalance {
                employee_id: employee_id.to_string(),
                total_points: 0,
                last_updated: at,
                last_updated_by: None,
            });
        balance.total_points += delta;
        balance.last_updated = at;
        balance.last_updated_by = actor_id.map(str::to_string);
        let updated = balance.clone();
        drop(tables);
        self.wrote().await;
        Ok(updated)
    }

    async fn try_debit_points(
        &self,
        employee_id: &str,
        amount: i64,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<PointBalance>> {
        self.check(StoreOp::DebitPoints).await?;
        let mut tables = self.tables.write().await;
        let Some(balance) = tables.balances.get_mut(employee_id) else {
            return Ok(None);
        };
        if balance.total_points < amount {
            return Ok(None);
        }
        balance.total_points -= amount;
        balance.last_updated = at;
        balance.last_updated_by = actor_id.map(str::to_string);
        let updated = balance.clone();
        drop(tables);
        self.wrote().await;
        Ok(Some(updated))
    }
}
