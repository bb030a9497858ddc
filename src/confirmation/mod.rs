//! Attendance confirmation.
//!
//! An event owner confirms attendance once the event has started. Every
//! employee still marked `provisional-attend` is promoted to
//! `confirmed-attend`, gets a participation history row, a CIZ ledger row,
//! a bumped participation counter and the attendance points on their
//! balance.
//!
//! ```text
//! window check -> provisional attendees -> history -> ledger
//!              -> counters -> balances -> status flip
//! ```
//!
//! The outcome is always a [`ConfirmationOutcome`]; store failures are
//! logged and collapsed into a generic failure message.

mod guard;
mod procedure;
mod window;

pub use guard::{ConfirmationGuard, InFlightTicket};
pub use procedure::{confirm_attendance, AttendanceConfirmation};
pub use window::{is_confirmation_allowed, parse_start_time, ConfirmationWindow};

use serde::Serialize;

/// Precondition: the event carries no start time.
pub const MSG_START_NOT_SET: &str = "event start time is not set";
/// Precondition: the start time could not be parsed.
pub const MSG_START_INVALID: &str = "event start time is invalid";
/// Window check: `now` is before the event start.
pub const MSG_NOT_STARTED: &str = "event has not started yet";
/// Precondition: nobody is marked `provisional-attend`.
pub const MSG_NO_ATTENDEES: &str = "no attendees are scheduled";
/// Another confirmation for the same event is running in this process.
pub const MSG_IN_PROGRESS: &str = "attendance confirmation is already in progress";
pub const MSG_CONFIRMED: &str = "attendance confirmed";
pub const MSG_FAILED: &str = "attendance confirmation failed";

/// Window check: the event started longer ago than the window allows.
pub fn window_elapsed_message(window_hours: i64) -> String {
    format!(
        "more than {} hours have elapsed since the event started",
        window_hours
    )
}

/// Result of the time-window check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Eligibility {
    pub fn allowed() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Caller-facing result of a confirmation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationOutcome {
    pub success: bool,
    pub message: String,
}

impl ConfirmationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
