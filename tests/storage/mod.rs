//! Shared storage integration tests.
//!
//! Tests the AttendanceStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod attendance_store_tests;
