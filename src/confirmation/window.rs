//! Confirmation time window.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use super::{window_elapsed_message, Eligibility, MSG_NOT_STARTED, MSG_START_INVALID};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ConfirmationConfig};

const DEFAULT_WINDOW_HOURS: i64 = 24;
const DEFAULT_OFFSET_SECONDS: i32 = 9 * 3600;

/// Naive layouts accepted for start times without an offset.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an event start time into the deployment offset.
///
/// Strings with an explicit offset keep their instant. Naive strings are
/// wall-clock time in `offset`; a bare date means midnight.
pub fn parse_start_time(raw: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&offset));
    }
    // Postgres text output, e.g. "2025-04-01 10:00:00+00".
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&offset));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    offset.from_local_datetime(&naive).single()
}

/// Decides whether confirmation may run for a given start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationWindow {
    max_elapsed: Duration,
    offset: FixedOffset,
}

impl Default for ConfirmationWindow {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::hours(DEFAULT_WINDOW_HOURS),
            offset: FixedOffset::east_opt(DEFAULT_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl ConfirmationWindow {
    pub fn new(max_elapsed: Duration, offset: FixedOffset) -> Self {
        Self {
            max_elapsed,
            offset,
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.window(), config.offset()?))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Check `start_at` against `now`.
    ///
    /// Both instants are compared in the deployment offset. Exactly
    /// `max_elapsed` after the start is still allowed.
    pub fn check(&self, start_at: &str, now: DateTime<Utc>) -> Eligibility {
        let Some(start) = parse_start_time(start_at, self.offset) else {
            return Eligibility::denied(MSG_START_INVALID);
        };
        let now = now.with_timezone(&self.offset);

        if now < start {
            Eligibility::denied(MSG_NOT_STARTED)
        } else if now - start > self.max_elapsed {
            Eligibility::denied(window_elapsed_message(self.max_elapsed.num_hours()))
        } else {
            Eligibility::allowed()
        }
    }
}

/// Check the default 24 hour window against the system clock.
pub fn is_confirmation_allowed(start_at: &str) -> Eligibility {
    ConfirmationWindow::default().check(start_at, SystemClock.now())
}
