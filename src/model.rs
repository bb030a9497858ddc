//! Domain records shared by the store, the confirmation procedure and the
//! point accounting operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Event classification deciding which participation counter moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Official,
    Unofficial,
}

impl Genre {
    /// Decode the stored genre flag.
    ///
    /// Anything that is not an explicit "official" marker counts as
    /// unofficial, matching how the counters are routed.
    pub fn from_flag(flag: &str) -> Self {
        match flag.trim().to_ascii_lowercase().as_str() {
            "official" | "1" | "true" => Genre::Official,
            _ => Genre::Unofficial,
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            Genre::Official => "official",
            Genre::Unofficial => "unofficial",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Read-only event input for the confirmation procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub genre: Genre,
    /// Declared start time as entered by the organizer. May be empty.
    pub start_at: String,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        genre: Genre,
        start_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre,
            start_at: start_at.into(),
        }
    }
}

/// Status of one employee's attendance on one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "provisional-attend")]
    ProvisionalAttend,
    #[serde(rename = "provisional-absent")]
    ProvisionalAbsent,
    #[serde(rename = "confirmed-attend")]
    ConfirmedAttend,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::ProvisionalAttend => "provisional-attend",
            AttendanceStatus::ProvisionalAbsent => "provisional-absent",
            AttendanceStatus::ConfirmedAttend => "confirmed-attend",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown attendance status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AttendanceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provisional-attend" => Ok(AttendanceStatus::ProvisionalAttend),
            "provisional-absent" => Ok(AttendanceStatus::ProvisionalAbsent),
            "confirmed-attend" => Ok(AttendanceStatus::ConfirmedAttend),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub event_id: String,
    pub employee_id: String,
    pub status: AttendanceStatus,
}

/// Append-only participation log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationHistoryRecord {
    pub id: i64,
    pub employee_id: String,
    pub event_id: String,
    pub participation_date: NaiveDate,
}

/// Append-only CIZ point ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLedgerRecord {
    pub id: i64,
    pub employee_id: String,
    pub delta: i64,
    pub reason: String,
    /// Absent for transfers between employees.
    pub event_id: Option<String>,
    pub actor_id: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationCounters {
    pub employee_id: String,
    pub official_count: i64,
    pub unofficial_count: i64,
    pub last_updated: DateTime<FixedOffset>,
}

impl ParticipationCounters {
    pub fn count_for(&self, genre: Genre) -> i64 {
        match genre {
            Genre::Official => self.official_count,
            Genre::Unofficial => self.unofficial_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBalance {
    pub employee_id: String,
    pub total_points: i64,
    pub last_updated: DateTime<FixedOffset>,
    pub last_updated_by: Option<String>,
}

/// Next id for a client-assigned sequence column: current maximum plus one,
/// with an empty table counting as zero.
pub fn next_sequence(current_max: Option<i64>) -> i64 {
    current_max.unwrap_or(0) + 1
}
