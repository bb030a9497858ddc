//! In-process guard against concurrent confirmation of one event.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

static PROCESS_GUARD: OnceLock<ConfirmationGuard> = OnceLock::new();

/// Set of event ids with a confirmation currently running.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ConfirmationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The guard shared by every caller in this process.
    pub fn process_wide() -> Self {
        PROCESS_GUARD.get_or_init(Self::new).clone()
    }

    /// Claim `event_id`. Returns `None` while another ticket for it is alive.
    pub fn try_acquire(&self, event_id: &str) -> Option<InFlightTicket> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(event_id.to_string()) {
            return None;
        }
        Some(InFlightTicket {
            in_flight: Arc::clone(&self.in_flight),
            event_id: event_id.to_string(),
        })
    }

    pub fn is_in_flight(&self, event_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(event_id)
    }
}

/// Releases its event id on drop, including when the owning future is
/// cancelled.
#[derive(Debug)]
pub struct InFlightTicket {
    in_flight: Arc<Mutex<HashSet<String>>>,
    event_id: String,
}

impl InFlightTicket {
    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.event_id);
    }
}
