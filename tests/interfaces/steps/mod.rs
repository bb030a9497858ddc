//! Cucumber step definitions for interface tests.

mod points;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use cucumber::{given, World};
use sopha::clock::FixedClock;
use sopha::confirmation::{ConfirmationOutcome, Eligibility};
use sopha::model::Event;
use sopha::points::{PointsError, TransferReceipt};
use sopha::storage::AttendanceStore;

use crate::backend::{StorageBackend, StorageContext};

/// Test context shared by the attendance and point scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct AttendanceWorld {
    backend: StorageBackend,
    context: Option<StorageContext>,
    clock: Arc<FixedClock>,
    event: Option<Event>,
    last_outcome: Option<ConfirmationOutcome>,
    last_eligibility: Option<Eligibility>,
    last_transfer: Option<Result<TransferReceipt, PointsError>>,
}

impl AttendanceWorld {
    fn new() -> Self {
        Self {
            backend: StorageBackend::from_env(),
            context: None,
            clock: Arc::new(FixedClock::new(Utc::now())),
            event: None,
            last_outcome: None,
            last_eligibility: None,
            last_transfer: None,
        }
    }

    fn store(&self) -> Arc<dyn AttendanceStore> {
        self.context
            .as_ref()
            .expect("Storage context not initialized")
            .store
            .clone()
    }

    fn event(&self) -> &Event {
        self.event.as_ref().expect("No event in scenario")
    }
}

pub(crate) fn parse_time(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).expect("Scenario timestamps are RFC 3339")
}

pub(crate) fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// --- Background ---

#[given("an attendance store backend")]
async fn given_attendance_store_backend(world: &mut AttendanceWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(StorageContext::new(world.backend).await);
}

#[given(expr = "the current time is {string}")]
async fn given_current_time(world: &mut AttendanceWorld, now: String) {
    world.clock.set(parse_time(&now).with_timezone(&Utc));
}
