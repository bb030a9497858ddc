//! Sopha - attendance confirmation and CIZ point accounting.
//!
//! Event owners confirm attendance after an event has started. Confirmation
//! promotes provisional attendees, records participation history, bumps the
//! per-genre participation counters and awards CIZ points through an
//! append-only ledger and a running balance.

pub mod attendance;
pub mod clock;
pub mod config;
pub mod confirmation;
pub mod model;
pub mod points;
pub mod schedule;
pub mod storage;
pub mod utils;
