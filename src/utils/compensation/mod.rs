//! Compensation journal for multi-step store writes.
//!
//! The store has no transaction spanning several calls, so workflows record
//! each write that succeeded. When a later step fails, the journal replays
//! the inverse of every recorded step, newest first:
//! - inserted history/ledger rows are deleted by id
//! - counter and balance increments are applied again with the opposite sign
//!
//! Undoing an increment leaves the counter or balance row in place at its
//! previous value, so a row the workflow created stays behind at zero.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::model::Genre;
use crate::storage::{AttendanceStore, StorageError};

/// Result type for compensation operations.
pub type Result<T> = std::result::Result<T, CompensationError>;

/// Errors that can occur while undoing applied steps.
#[derive(Debug, thiserror::Error)]
pub enum CompensationError {
    #[error("Compensation of {operation} incomplete: {undone} step(s) undone, {} failed", .failed.len())]
    Incomplete {
        operation: String,
        undone: usize,
        failed: Vec<(AppliedStep, StorageError)>,
    },
}

/// One write that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedStep {
    HistoryInserted {
        ids: Vec<i64>,
    },
    LedgerInserted {
        ids: Vec<i64>,
    },
    ParticipationAdded {
        employee_id: String,
        genre: Genre,
        delta: i64,
    },
    PointsAdded {
        employee_id: String,
        delta: i64,
    },
}

impl fmt::Display for AppliedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppliedStep::HistoryInserted { ids } => write!(f, "history rows {:?}", ids),
            AppliedStep::LedgerInserted { ids } => write!(f, "ledger rows {:?}", ids),
            AppliedStep::ParticipationAdded {
                employee_id,
                genre,
                delta,
            } => write!(f, "{} counter {:+} for {}", genre, delta, employee_id),
            AppliedStep::PointsAdded { employee_id, delta } => {
                write!(f, "points {:+} for {}", delta, employee_id)
            }
        }
    }
}

/// Ordered record of the steps a workflow has applied.
#[derive(Debug)]
pub struct CompensationJournal {
    operation: String,
    run_id: Uuid,
    steps: Vec<AppliedStep>,
}

impl CompensationJournal {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            run_id: Uuid::new_v4(),
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: AppliedStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[AppliedStep] {
        &self.steps
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Undo every recorded step, newest first.
    ///
    /// A failing undo does not stop the remaining ones. Returns the number of
    /// steps undone, or `Incomplete` listing the steps still applied.
    pub async fn compensate(
        self,
        store: &dyn AttendanceStore,
        actor_id: Option<&str>,
        at: DateTime<FixedOffset>,
    ) -> Result<usize> {
        if self.steps.is_empty() {
            return Ok(0);
        }

        warn!(
            operation = %self.operation,
            run_id = %self.run_id,
            steps = self.steps.len(),
            "Compensating applied steps"
        );

        let mut undone = 0;
        let mut failed = Vec::new();

        for step in self.steps.into_iter().rev() {
            match undo(store, &step, actor_id, at).await {
                Ok(()) => undone += 1,
                Err(e) => {
                    error!(
                        operation = %self.operation,
                        run_id = %self.run_id,
                        step = %step,
                        error = %e,
                        "Failed to undo step"
                    );
                    failed.push((step, e));
                }
            }
        }

        if failed.is_empty() {
            info!(
                operation = %self.operation,
                run_id = %self.run_id,
                undone,
                "Compensation complete"
            );
            Ok(undone)
        } else {
            Err(CompensationError::Incomplete {
                operation: self.operation,
                undone,
                failed,
            })
        }
    }
}

async fn undo(
    store: &dyn AttendanceStore,
    step: &AppliedStep,
    actor_id: Option<&str>,
    at: DateTime<FixedOffset>,
) -> std::result::Result<(), StorageError> {
    match step {
        AppliedStep::HistoryInserted { ids } => store.delete_history(ids).await,
        AppliedStep::LedgerInserted { ids } => store.delete_ledger(ids).await,
        AppliedStep::ParticipationAdded {
            employee_id,
            genre,
            delta,
        } => store
            .add_participation(employee_id, *genre, -delta, at)
            .await
            .map(|_| ()),
        AppliedStep::PointsAdded { employee_id, delta } => store
            .add_points(employee_id, -delta, actor_id, at)
            .await
            .map(|_| ()),
    }
}
