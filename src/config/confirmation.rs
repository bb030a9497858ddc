//! Attendance confirmation settings.

use chrono::{Duration, FixedOffset};
use serde::Deserialize;

use super::ConfigError;

const SECONDS_PER_HOUR: i32 = 3600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// CIZ points awarded to each confirmed attendee.
    pub points_per_attendance: i64,
    /// How long after the event start confirmation stays open.
    pub window_hours: i64,
    /// Deployment offset both timestamps are normalized to (+9 = JST).
    pub utc_offset_hours: i32,
    /// Appended to the event title to form the ledger reason.
    pub reason_suffix: String,
    /// Undo already-applied steps when a later step fails.
    pub compensate_on_failure: bool,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            points_per_attendance: 1000,
            window_hours: 24,
            utc_offset_hours: 9,
            reason_suffix: " attendance point".to_string(),
            compensate_on_failure: true,
        }
    }
}

impl ConfirmationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points_per_attendance <= 0 {
            return Err(ConfigError::Invalid(format!(
                "confirmation.points_per_attendance must be positive, got {}",
                self.points_per_attendance
            )));
        }
        if self.window_hours <= 0 {
            return Err(ConfigError::Invalid(format!(
                "confirmation.window_hours must be positive, got {}",
                self.window_hours
            )));
        }
        self.offset()?;
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_hours
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "confirmation.utc_offset_hours out of range: {}",
                    self.utc_offset_hours
                ))
            })
    }

    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }

    pub fn reason_for(&self, title: &str) -> String {
        format!("{}{}", title, self.reason_suffix)
    }
}
