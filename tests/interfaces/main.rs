//! Interface tests for the attendance workflow using Cucumber.
//!
//! Scenarios run against a fresh store per scenario. Select a backend via
//! environment variable:
//!
//! ```bash
//! # SQLite in-memory (default)
//! cargo test --test interfaces
//!
//! # Process-local tables
//! STORAGE_BACKEND=memory cargo test --test interfaces
//! ```

mod backend;
mod steps;

use cucumber::World;
use steps::AttendanceWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Attendance Confirmation Interface Tests ===\n");
    AttendanceWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/interfaces/features/attendance_confirmation.feature")
        .await;

    println!("\n=== Running Point Transfer Interface Tests ===\n");
    AttendanceWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/interfaces/features/point_transfer.feature")
        .await;
}
