//! Attendance registration.
//!
//! Employees answer an event with attend or absent. The answer is stored as a
//! provisional status until the event owner confirms attendance.

use serde::Serialize;
use tracing::{debug, info};

use crate::model::AttendanceStatus;
use crate::storage::{AttendanceStore, StorageError};

pub type Result<T> = std::result::Result<T, AttendanceError>;

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Attendance of {employee_id} on {event_id} is already confirmed")]
    AlreadyConfirmed {
        event_id: String,
        employee_id: String,
    },

    #[error("Unknown attendance intent: {0}")]
    UnknownIntent(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What an employee answered for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceIntent {
    Attend,
    Absent,
}

impl AttendanceIntent {
    pub fn provisional_status(&self) -> AttendanceStatus {
        match self {
            AttendanceIntent::Attend => AttendanceStatus::ProvisionalAttend,
            AttendanceIntent::Absent => AttendanceStatus::ProvisionalAbsent,
        }
    }
}

impl std::str::FromStr for AttendanceIntent {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attend" => Ok(AttendanceIntent::Attend),
            "absent" => Ok(AttendanceIntent::Absent),
            other => Err(AttendanceError::UnknownIntent(other.to_string())),
        }
    }
}

/// Record or change an employee's provisional answer.
///
/// Confirmed entries are final and cannot be re-registered.
pub async fn register_attendance(
    store: &dyn AttendanceStore,
    event_id: &str,
    employee_id: &str,
    intent: AttendanceIntent,
) -> Result<AttendanceStatus> {
    if let Some(entry) = store.get_entry(event_id, employee_id).await? {
        if entry.status == AttendanceStatus::ConfirmedAttend {
            return Err(AttendanceError::AlreadyConfirmed {
                event_id: event_id.to_string(),
                employee_id: employee_id.to_string(),
            });
        }
    }

    let status = intent.provisional_status();
    store.upsert_entry(event_id, employee_id, status).await?;
    debug!(event_id, employee_id, status = %status, "Attendance registered");
    Ok(status)
}

/// Entry counts per status for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub provisional_attend: usize,
    pub provisional_absent: usize,
    pub confirmed_attend: usize,
}

impl AttendanceSummary {
    pub fn total(&self) -> usize {
        self.provisional_attend + self.provisional_absent + self.confirmed_attend
    }
}

pub async fn attendance_summary(
    store: &dyn AttendanceStore,
    event_id: &str,
) -> Result<AttendanceSummary> {
    let summary = store
        .list_entries(event_id)
        .await?
        .iter()
        .fold(AttendanceSummary::default(), |mut acc, entry| {
            match entry.status {
                AttendanceStatus::ProvisionalAttend => acc.provisional_attend += 1,
                AttendanceStatus::ProvisionalAbsent => acc.provisional_absent += 1,
                AttendanceStatus::ConfirmedAttend => acc.confirmed_attend += 1,
            }
            acc
        });
    info!(event_id, total = summary.total(), "Attendance summarized");
    Ok(summary)
}
