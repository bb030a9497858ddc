//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Events table schema.
#[derive(Iden)]
pub enum Events {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "title"]
    Title,
    #[iden = "genre"]
    Genre,
    #[iden = "start_at"]
    StartAt,
}

/// Attendance entries table schema.
#[derive(Iden)]
pub enum AttendanceEntries {
    Table,
    #[iden = "event_id"]
    EventId,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "status"]
    Status,
}

/// Participation history table schema.
#[derive(Iden)]
pub enum ParticipationHistory {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "event_id"]
    EventId,
    #[iden = "participation_date"]
    ParticipationDate,
}

/// Point ledger table schema.
#[derive(Iden)]
pub enum PointLedger {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "delta"]
    Delta,
    #[iden = "reason"]
    Reason,
    #[iden = "event_id"]
    EventId,
    #[iden = "actor_id"]
    ActorId,
    #[iden = "created_at"]
    CreatedAt,
}

/// Participation counters table schema.
#[derive(Iden)]
pub enum ParticipationCounters {
    Table,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "official_count"]
    OfficialCount,
    #[iden = "unofficial_count"]
    UnofficialCount,
    #[iden = "last_updated"]
    LastUpdated,
}

/// Point balances table schema.
#[derive(Iden)]
pub enum PointBalances {
    Table,
    #[iden = "employee_id"]
    EmployeeId,
    #[iden = "total_points"]
    TotalPoints,
    #[iden = "last_updated"]
    LastUpdated,
    #[iden = "last_updated_by"]
    LastUpdatedBy,
}

/// SQL for creating the events table.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    genre TEXT NOT NULL,
    start_at TEXT NOT NULL DEFAULT ''
);
"#;

/// SQL for creating the attendance entries table.
pub const CREATE_ATTENDANCE_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS attendance_entries (
    event_id TEXT NOT NULL,
    employee_id TEXT NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (event_id, employee_id)
);
"#;

/// SQL for creating the participation history table.
pub const CREATE_PARTICIPATION_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS participation_history (
    id INTEGER PRIMARY KEY NOT NULL,
    employee_id TEXT NOT NULL,
    event_id TEXT NOT NULL,
    participation_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_participation_history_event ON participation_history(event_id);
"#;

/// SQL for creating the point ledger table.
pub const CREATE_POINT_LEDGER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS point_ledger (
    id INTEGER PRIMARY KEY NOT NULL,
    employee_id TEXT NOT NULL,
    delta INTEGER NOT NULL,
    reason TEXT NOT NULL,
    event_id TEXT,
    actor_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_point_ledger_employee ON point_ledger(employee_id);
"#;

/// SQL for creating the participation counters table.
pub const CREATE_PARTICIPATION_COUNTERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS participation_counters (
    employee_id TEXT PRIMARY KEY NOT NULL,
    official_count INTEGER NOT NULL DEFAULT 0,
    unofficial_count INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL
);
"#;

/// SQL for creating the point balances table.
pub const CREATE_POINT_BALANCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS point_balances (
    employee_id TEXT PRIMARY KEY NOT NULL,
    total_points INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL,
    last_updated_by TEXT
);
"#;

/// All table definitions, in creation order.
pub const ALL_TABLES: [&str; 6] = [
    CREATE_EVENTS_TABLE,
    CREATE_ATTENDANCE_ENTRIES_TABLE,
    CREATE_PARTICIPATION_HISTORY_TABLE,
    CREATE_POINT_LEDGER_TABLE,
    CREATE_PARTICIPATION_COUNTERS_TABLE,
    CREATE_POINT_BALANCES_TABLE,
];
