//! The confirmation procedure.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, error, info, warn};

use super::{
    ConfirmationGuard, ConfirmationOutcome, ConfirmationWindow, Eligibility, MSG_CONFIRMED,
    MSG_FAILED, MSG_IN_PROGRESS, MSG_NO_ATTENDEES, MSG_START_NOT_SET,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ConfirmationConfig};
use crate::model::{
    next_sequence, AttendanceStatus, Event, ParticipationHistoryRecord, PointLedgerRecord,
};
use crate::storage::{self, AttendanceStore};
use crate::utils::compensation::{AppliedStep, CompensationJournal};

/// Confirms attendance for events against an [`AttendanceStore`].
///
/// Clones share the store, the clock and the in-flight guard.
#[derive(Clone)]
pub struct AttendanceConfirmation {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    config: ConfirmationConfig,
    window: ConfirmationWindow,
    pub(super) guard: ConfirmationGuard,
}

impl AttendanceConfirmation {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        config: ConfirmationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = ConfirmationWindow::from_config(&config)?;
        Ok(Self {
            store,
            clock: Arc::new(SystemClock),
            config,
            window,
            guard: ConfirmationGuard::new(),
        })
    }

    /// Share `guard` with other confirmation instances.
    pub fn with_guard(mut self, guard: ConfirmationGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Replace the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Time-window check against this instance's clock.
    pub fn is_confirmation_allowed(&self, start_at: &str) -> Eligibility {
        self.window.check(start_at, self.clock.now())
    }

    /// Promote every `provisional-attend` entry of the event to
    /// `confirmed-attend`, recording history and awarding points.
    ///
    /// Preconditions (start time set, window open, at least one provisional
    /// attendee) fail without writing anything. A store failure after that
    /// undoes the steps already applied when `compensate_on_failure` is set.
    ///
    /// The procedure does not check whether it already ran for this event:
    /// a second sequential call awards points and appends history again.
    #[tracing::instrument(name = "attendance.confirm", skip_all, fields(event_id = %event_id))]
    pub async fn confirm_attendance(
        &self,
        event_id: &str,
        event: &Event,
        actor_id: Option<&str>,
    ) -> ConfirmationOutcome {
        let Some(_ticket) = self.guard.try_acquire(event_id) else {
            warn!("Confirmation already running for this event");
            return ConfirmationOutcome::failure(MSG_IN_PROGRESS);
        };

        if event.start_at.trim().is_empty() {
            return ConfirmationOutcome::failure(MSG_START_NOT_SET);
        }

        let eligibility = self.is_confirmation_allowed(&event.start_at);
        if !eligibility.is_valid {
            let reason = eligibility.message.unwrap_or_default();
            info!(reason = %reason, "Confirmation window closed");
            return ConfirmationOutcome::failure(reason);
        }

        match self.store.provisional_attendees(event_id).await {
            Ok(attendees) if attendees.is_empty() => {
                return ConfirmationOutcome::failure(MSG_NO_ATTENDEES);
            }
            Ok(attendees) => debug!(attendees = attendees.len(), "Provisional attendees found"),
            Err(e) => {
                error!(error = %e, "Failed to load provisional attendees");
                return ConfirmationOutcome::failure(MSG_FAILED);
            }
        }

        let now = self.clock.now().with_timezone(&self.window.offset());
        let mut journal = CompensationJournal::new(format!("confirm_attendance:{}", event_id));

        match self.apply(event_id, event, actor_id, now, &mut journal).await {
            Ok(confirmed) => {
                info!(
                    confirmed,
                    genre = %event.genre,
                    points = self.config.points_per_attendance,
                    "Attendance confirmed"
                );
                ConfirmationOutcome::success(MSG_CONFIRMED)
            }
            Err(e) => {
                error!(
                    error = %e,
                    run_id = %journal.run_id(),
                    applied = journal.steps().len(),
                    "Attendance confirmation failed"
                );
                if self.config.compensate_on_failure {
                    if let Err(e) = journal
                        .compensate(self.store.as_ref(), actor_id, now)
                        .await
                    {
                        error!(error = %e, "Attendance confirmation left partial state");
                    }
                } else if !journal.is_empty() {
                    warn!(
                        applied = journal.steps().len(),
                        "Compensation disabled, partial state left in store"
                    );
                }
                ConfirmationOutcome::failure(MSG_FAILED)
            }
        }
    }

    /// Steps 1-6. Each successful write is recorded in `journal`.
    async fn apply(
        &self,
        event_id: &str,
        event: &Event,
        actor_id: Option<&str>,
        now: DateTime<FixedOffset>,
        journal: &mut CompensationJournal,
    ) -> storage::Result<usize> {
        let store = self.store.as_ref();
        let points = self.config.points_per_attendance;

        let attendees = store.provisional_attendees(event_id).await?;
        if attendees.is_empty() {
            return Ok(0);
        }

        let first_history_id = next_sequence(store.max_history_id().await?);
        let participation_date = now.date_naive();
        let history: Vec<ParticipationHistoryRecord> = attendees
            .iter()
            .zip(first_history_id..)
            .map(|(employee_id, id)| ParticipationHistoryRecord {
                id,
                employee_id: employee_id.clone(),
                event_id: event_id.to_string(),
                participation_date,
            })
            .collect();
        store.insert_history(&history).await?;
        journal.record(AppliedStep::HistoryInserted {
            ids: history.iter().map(|r| r.id).collect(),
        });

        let first_ledger_id = next_sequence(store.max_ledger_id().await?);
        let reason = self.config.reason_for(&event.title);
        let ledger: Vec<PointLedgerRecord> = attendees
            .iter()
            .zip(first_ledger_id..)
            .map(|(employee_id, id)| PointLedgerRecord {
                id,
                employee_id: employee_id.clone(),
                delta: points,
                reason: reason.clone(),
                event_id: Some(event_id.to_string()),
                actor_id: actor_id.map(str::to_string),
                created_at: now,
            })
            .collect();
        store.insert_ledger(&ledger).await?;
        journal.record(AppliedStep::LedgerInserted {
            ids: ledger.iter().map(|r| r.id).collect(),
        });

        for employee_id in &attendees {
            store
                .add_participation(employee_id, event.genre, 1, now)
                .await?;
            journal.record(AppliedStep::ParticipationAdded {
                employee_id: employee_id.clone(),
                genre: event.genre,
                delta: 1,
            });
        }

        for employee_id in &attendees {
            store.add_points(employee_id, points, actor_id, now).await?;
            journal.record(AppliedStep::PointsAdded {
                employee_id: employee_id.clone(),
                delta: points,
            });
        }

        store
            .set_status(event_id, &attendees, AttendanceStatus::ConfirmedAttend)
            .await?;

        Ok(attendees.len())
    }
}

/// Confirm attendance with the default settings and the system clock.
///
/// Calls for the same event id refuse each other anywhere in the process.
pub async fn confirm_attendance(
    store: Arc<dyn AttendanceStore>,
    event_id: &str,
    event: &Event,
    actor_id: Option<&str>,
) -> ConfirmationOutcome {
    match AttendanceConfirmation::new(store, ConfirmationConfig::default()) {
        Ok(confirmation) => {
            confirmation
                .with_guard(ConfirmationGuard::process_wide())
                .confirm_attendance(event_id, event, actor_id)
                .await
        }
        Err(e) => {
            error!(error = %e, "Invalid default confirmation settings");
            ConfirmationOutcome::failure(MSG_FAILED)
        }
    }
}
