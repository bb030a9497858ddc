//! CIZ point accounting outside of attendance confirmation.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::model::{next_sequence, PointLedgerRecord};
use crate::storage::{AttendanceStore, StorageError};
use crate::utils::compensation::{AppliedStep, CompensationJournal};

pub type Result<T> = std::result::Result<T, PointsError>;

#[derive(Debug, thiserror::Error)]
pub enum PointsError {
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Cannot transfer points from {0} to themselves")]
    SameEmployee(String),

    #[error("{employee_id} has {available} points, {requested} requested")]
    InsufficientPoints {
        employee_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A point transfer between two employees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub note: String,
}

impl TransferRequest {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: i64,
        note: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            note: note.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(PointsError::InvalidAmount(self.amount));
        }
        if self.from == self.to {
            return Err(PointsError::SameEmployee(self.from.clone()));
        }
        Ok(())
    }
}

/// Balances after a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub from_balance: i64,
    pub to_balance: i64,
    pub ledger_ids: [i64; 2],
}

/// Move `amount` points from one employee to another.
///
/// The sender is debited only if their balance covers the amount. Both
/// ledger rows are appended in one insert. Any failure after the debit
/// reverses the steps already applied.
pub async fn transfer_points(
    store: &dyn AttendanceStore,
    request: &TransferRequest,
    actor_id: Option<&str>,
    at: DateTime<FixedOffset>,
) -> Result<TransferReceipt> {
    request.validate()?;

    let Some(sender) = store
        .try_debit_points(&request.from, request.amount, actor_id, at)
        .await?
    else {
        let available = balance(store, &request.from).await?;
        warn!(
            from = %request.from,
            available,
            requested = request.amount,
            "Transfer refused"
        );
        return Err(PointsError::InsufficientPoints {
            employee_id: request.from.clone(),
            available,
            requested: request.amount,
        });
    };

    let mut journal = CompensationJournal::new(format!(
        "transfer_points:{}->{}",
        request.from, request.to
    ));
    journal.record(AppliedStep::PointsAdded {
        employee_id: request.from.clone(),
        delta: -request.amount,
    });

    match credit_and_record(store, request, actor_id, at, &mut journal).await {
        Ok((receiver, ledger_ids)) => {
            info!(
                from = %request.from,
                to = %request.to,
                amount = request.amount,
                "Points transferred"
            );
            Ok(TransferReceipt {
                from_balance: sender.total_points,
                to_balance: receiver,
                ledger_ids,
            })
        }
        Err(e) => {
            error!(error = %e, run_id = %journal.run_id(), "Point transfer failed");
            if let Err(e) = journal.compensate(store, actor_id, at).await {
                error!(error = %e, "Point transfer left partial state");
            }
            Err(e.into())
        }
    }
}

async fn credit_and_record(
    store: &dyn AttendanceStore,
    request: &TransferRequest,
    actor_id: Option<&str>,
    at: DateTime<FixedOffset>,
    journal: &mut CompensationJournal,
) -> std::result::Result<(i64, [i64; 2]), StorageError> {
    let receiver = store
        .add_points(&request.to, request.amount, actor_id, at)
        .await?;
    journal.record(AppliedStep::PointsAdded {
        employee_id: request.to.clone(),
        delta: request.amount,
    });

    let debit_id = next_sequence(store.max_ledger_id().await?);
    let credit_id = debit_id + 1;
    let row = |id, employee_id: &str, delta, reason: String| PointLedgerRecord {
        id,
        employee_id: employee_id.to_string(),
        delta,
        reason,
        event_id: None,
        actor_id: actor_id.map(str::to_string),
        created_at: at,
    };
    store
        .insert_ledger(&[
            row(
                debit_id,
                &request.from,
                -request.amount,
                format!("transfer to {}: {}", request.to, request.note),
            ),
            row(
                credit_id,
                &request.to,
                request.amount,
                format!("transfer from {}: {}", request.from, request.note),
            ),
        ])
        .await?;

    Ok((receiver.total_points, [debit_id, credit_id]))
}

/// Current point total, zero when the employee has no balance row.
pub async fn balance(store: &dyn AttendanceStore, employee_id: &str) -> Result<i64> {
    Ok(store
        .point_balance(employee_id)
        .await?
        .map(|b| b.total_points)
        .unwrap_or(0))
}
