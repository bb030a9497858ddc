//! AttendanceStore interface tests.
//!
//! These tests verify the contract of the AttendanceStore trait.
//! Each storage implementation should run these tests. Every test uses its
//! own event and employee ids so they can share one store.

use chrono::{DateTime, FixedOffset, NaiveDate};
use uuid::Uuid;

use sopha::model::{
    next_sequence, AttendanceStatus, Event, Genre, ParticipationHistoryRecord, PointLedgerRecord,
};
use sopha::storage::{AttendanceStore, StorageError};

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

pub fn at(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).expect("valid timestamp")
}

fn history(id: i64, employee_id: &str, event_id: &str) -> ParticipationHistoryRecord {
    ParticipationHistoryRecord {
        id,
        employee_id: employee_id.to_string(),
        event_id: event_id.to_string(),
        participation_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
    }
}

fn ledger(id: i64, employee_id: &str, delta: i64, actor: Option<&str>) -> PointLedgerRecord {
    PointLedgerRecord {
        id,
        employee_id: employee_id.to_string(),
        delta,
        reason: "Spring Offsite attendance point".to_string(),
        event_id: Some("evt-contract".to_string()),
        actor_id: actor.map(str::to_string),
        created_at: at("2025-04-01T12:00:00+09:00"),
    }
}

// =============================================================================
// Events
// =============================================================================

pub async fn test_event_round_trip<S: AttendanceStore + ?Sized>(store: &S) {
    let event = Event::new(
        unique("evt"),
        "Spring Offsite",
        Genre::Official,
        "2025-04-01T10:00:00+09:00",
    );
    store.put_event(&event).await.expect("put should succeed");

    let loaded = store.get_event(&event.id).await.expect("get should succeed");
    assert_eq!(loaded, Some(event.clone()));

    let renamed = Event {
        title: "Spring Offsite (moved)".to_string(),
        ..event.clone()
    };
    store.put_event(&renamed).await.expect("replace should succeed");
    let loaded = store.get_event(&event.id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Spring Offsite (moved)");

    assert!(store.get_event(&unique("evt")).await.unwrap().is_none());
}

// =============================================================================
// Attendance entries
// =============================================================================

pub async fn test_entries_and_provisional_attendees<S: AttendanceStore + ?Sized>(store: &S) {
    let event_id = unique("evt");
    for (employee, status) in [
        ("emp-c", AttendanceStatus::ProvisionalAttend),
        ("emp-a", AttendanceStatus::ProvisionalAttend),
        ("emp-b", AttendanceStatus::ProvisionalAbsent),
        ("emp-d", AttendanceStatus::ConfirmedAttend),
    ] {
        store.upsert_entry(&event_id, employee, status).await.unwrap();
    }

    let attendees = store.provisional_attendees(&event_id).await.unwrap();
    assert_eq!(attendees, vec!["emp-a".to_string(), "emp-c".to_string()]);

    let entries = store.list_entries(&event_id).await.unwrap();
    let employees: Vec<&str> = entries.iter().map(|e| e.employee_id.as_str()).collect();
    assert_eq!(employees, vec!["emp-a", "emp-b", "emp-c", "emp-d"]);

    // Upsert replaces.
    store
        .upsert_entry(&event_id, "emp-b", AttendanceStatus::ProvisionalAttend)
        .await
        .unwrap();
    let entry = store.get_entry(&event_id, "emp-b").await.unwrap().unwrap();
    assert_eq!(entry.status, AttendanceStatus::ProvisionalAttend);
    assert_eq!(store.list_entries(&event_id).await.unwrap().len(), 4);

    assert!(store.get_entry(&event_id, "emp-z").await.unwrap().is_none());
    assert!(store
        .provisional_attendees(&unique("evt"))
        .await
        .unwrap()
        .is_empty());
}

pub async fn test_set_status_filters_by_event_and_ids<S: AttendanceStore + ?Sized>(store: &S) {
    let event_id = unique("evt");
    let other_event = unique("evt");
    for employee in ["emp-a", "emp-b", "emp-c"] {
        store
            .upsert_entry(&event_id, employee, AttendanceStatus::ProvisionalAttend)
            .await
            .unwrap();
    }
    store
        .upsert_entry(&other_event, "emp-a", AttendanceStatus::ProvisionalAttend)
        .await
        .unwrap();

    let changed = store
        .set_status(
            &event_id,
            &["emp-a".to_string(), "emp-b".to_string(), "emp-x".to_string()],
            AttendanceStatus::ConfirmedAttend,
        )
        .await
        .unwrap();
    assert_eq!(changed, 2);

    let remaining = store.provisional_attendees(&event_id).await.unwrap();
    assert_eq!(remaining, vec!["emp-c".to_string()]);
    let untouched = store.get_entry(&other_event, "emp-a").await.unwrap().unwrap();
    assert_eq!(untouched.status, AttendanceStatus::ProvisionalAttend);

    assert_eq!(
        store
            .set_status(&event_id, &[], AttendanceStatus::ConfirmedAttend)
            .await
            .unwrap(),
        0
    );
}

// =============================================================================
// Participation history
// =============================================================================

pub async fn test_history_insert_and_delete<S: AttendanceStore + ?Sized>(store: &S) {
    let event_id = unique("evt");
    let first = next_sequence(store.max_history_id().await.unwrap());

    store
        .insert_history(&[
            history(first, "emp-a", &event_id),
            history(first + 1, "emp-b", &event_id),
        ])
        .await
        .expect("insert should succeed");
    assert_eq!(store.max_history_id().await.unwrap(), Some(first + 1));

    let rows = store.history_for_event(&event_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, first);
    assert_eq!(rows[0].participation_date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());

    store.delete_history(&[first]).await.unwrap();
    let rows = store.history_for_event(&event_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].employee_id, "emp-b");

    store.insert_history(&[]).await.expect("empty insert is a no-op");
    store.delete_history(&[]).await.expect("empty delete is a no-op");
}

pub async fn test_history_duplicate_id_rejected<S: AttendanceStore + ?Sized>(store: &S) {
    let event_id = unique("evt");
    let id = next_sequence(store.max_history_id().await.unwrap());
    store
        .insert_history(&[history(id, "emp-a", &event_id)])
        .await
        .unwrap();

    // The batch fails as a whole: the fresh row next to the duplicate is not kept.
    let err = store
        .insert_history(&[
            history(id + 1, "emp-b", &event_id),
            history(id, "emp-c", &event_id),
        ])
        .await
        .expect_err("duplicate id must be rejected");
    assert!(
        matches!(err, StorageError::DuplicateKey { .. }),
        "unexpected error: {err}"
    );

    let rows = store.history_for_event(&event_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].employee_id, "emp-a");
}

// =============================================================================
// Point ledger
// =============================================================================

pub async fn test_ledger_insert_and_query<S: AttendanceStore + ?Sized>(store: &S) {
    let employee = unique("emp");
    let other = unique("emp");
    let first = next_sequence(store.max_ledger_id().await.unwrap());

    store
        .insert_ledger(&[
            ledger(first, &employee, 1000, Some("owner-1")),
            ledger(first + 1, &other, 1000, None),
            ledger(first + 2, &employee, -250, None),
        ])
        .await
        .expect("insert should succeed");
    assert_eq!(store.max_ledger_id().await.unwrap(), Some(first + 2));

    let rows = store.ledger_for_employee(&employee).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, first);
    assert_eq!(rows[0].delta, 1000);
    assert_eq!(rows[0].actor_id.as_deref(), Some("owner-1"));
    assert_eq!(rows[0].event_id.as_deref(), Some("evt-contract"));
    assert_eq!(rows[0].created_at, at("2025-04-01T12:00:00+09:00"));
    assert_eq!(rows[1].delta, -250);
    assert_eq!(rows[1].actor_id, None);

    store.delete_ledger(&[first, first + 2]).await.unwrap();
    assert!(store.ledger_for_employee(&employee).await.unwrap().is_empty());
    assert_eq!(store.ledger_for_employee(&other).await.unwrap().len(), 1);
}

pub async fn test_ledger_duplicate_id_rejected<S: AttendanceStore + ?Sized>(store: &S) {
    let employee = unique("emp");
    let id = next_sequence(store.max_ledger_id().await.unwrap());
    store
        .insert_ledger(&[ledger(id, &employee, 1000, None)])
        .await
        .unwrap();

    let err = store
        .insert_ledger(&[ledger(id, &employee, 1000, None)])
        .await
        .expect_err("duplicate id must be rejected");
    assert!(matches!(err, StorageError::DuplicateKey { .. }));
    assert_eq!(store.ledger_for_employee(&employee).await.unwrap().len(), 1);
}

// =============================================================================
// Participation counters
// =============================================================================

pub async fn test_participation_counters<S: AttendanceStore + ?Sized>(store: &S) {
    let employee = unique("emp");
    assert!(store.participation_counters(&employee).await.unwrap().is_none());

    let t1 = at("2025-04-01T12:00:00+09:00");
    let counters = store
        .add_participation(&employee, Genre::Official, 1, t1)
        .await
        .unwrap();
    assert_eq!(counters.official_count, 1);
    assert_eq!(counters.unofficial_count, 0);

    let t2 = at("2025-04-02T12:00:00+09:00");
    store
        .add_participation(&employee, Genre::Unofficial, 2, t2)
        .await
        .unwrap();
    let counters = store
        .add_participation(&employee, Genre::Official, 1, t2)
        .await
        .unwrap();
    assert_eq!(counters.official_count, 2);
    assert_eq!(counters.unofficial_count, 2);
    assert_eq!(counters.count_for(Genre::Unofficial), 2);
    assert_eq!(counters.last_updated, t2);

    // Negative deltas undo.
    store
        .add_participation(&employee, Genre::Official, -1, t2)
        .await
        .unwrap();
    let stored = store.participation_counters(&employee).await.unwrap().unwrap();
    assert_eq!(stored.official_count, 1);
    assert_eq!(stored.unofficial_count, 2);
}

// =============================================================================
// Point balances
// =============================================================================

pub async fn test_point_balance_increments<S: AttendanceStore + ?Sized>(store: &S) {
    let employee = unique("emp");
    assert!(store.point_balance(&employee).await.unwrap().is_none());

    let t = at("2025-04-01T12:00:00+09:00");
    let balance = store
        .add_points(&employee, 1000, Some("owner-1"), t)
        .await
        .unwrap();
    assert_eq!(balance.total_points, 1000);
    assert_eq!(balance.last_updated_by.as_deref(), Some("owner-1"));

    let balance = store.add_points(&employee, 1000, None, t).await.unwrap();
    assert_eq!(balance.total_points, 2000);
    assert_eq!(balance.last_updated_by, None);

    let stored = store.point_balance(&employee).await.unwrap().unwrap();
    assert_eq!(stored.total_points, 2000);
    assert_eq!(stored.last_updated, t);
}

pub async fn test_try_debit_points<S: AttendanceStore + ?Sized>(store: &S) {
    let employee = unique("emp");
    let t = at("2025-04-01T12:00:00+09:00");

    assert!(store
        .try_debit_points(&employee, 1, None, t)
        .await
        .unwrap()
        .is_none());

    store.add_points(&employee, 500, None, t).await.unwrap();
    assert!(store
        .try_debit_points(&employee, 501, None, t)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        store.point_balance(&employee).await.unwrap().unwrap().total_points,
        500
    );

    let debited = store
        .try_debit_points(&employee, 500, Some("emp-self"), t)
        .await
        .unwrap()
        .expect("exact balance is enough");
    assert_eq!(debited.total_points, 0);
    assert_eq!(debited.last_updated_by.as_deref(), Some("emp-self"));
}

pub async fn test_concurrent_increments_are_not_lost<S: AttendanceStore + ?Sized>(store: &S) {
    let employee = unique("emp");
    let t = at("2025-04-01T12:00:00+09:00");

    let adds = (0..20).map(|_| store.add_points(&employee, 10, None, t));
    let results = futures::future::join_all(adds).await;
    assert!(results.iter().all(Result::is_ok));

    let bumps = (0..20).map(|_| store.add_participation(&employee, Genre::Official, 1, t));
    futures::future::join_all(bumps).await;

    let balance = store.point_balance(&employee).await.unwrap().unwrap();
    assert_eq!(balance.total_points, 200);
    let counters = store.participation_counters(&employee).await.unwrap().unwrap();
    assert_eq!(counters.official_count, 20);
}

/// Run all AttendanceStore tests against a store implementation.
#[macro_export]
macro_rules! run_attendance_store_tests {
    ($store:expr) => {
        use $crate::storage::attendance_store_tests::*;

        test_event_round_trip($store).await;
        println!("  test_event_round_trip: PASSED");

        test_entries_and_provisional_attendees($store).await;
        println!("  test_entries_and_provisional_attendees: PASSED");

        test_set_status_filters_by_event_and_ids($store).await;
        println!("  test_set_status_filters_by_event_and_ids: PASSED");

        test_history_insert_and_delete($store).await;
        println!("  test_history_insert_and_delete: PASSED");

        test_history_duplicate_id_rejected($store).await;
        println!("  test_history_duplicate_id_rejected: PASSED");

        test_ledger_insert_and_query($store).await;
        println!("  test_ledger_insert_and_query: PASSED");

        test_ledger_duplicate_id_rejected($store).await;
        println!("  test_ledger_duplicate_id_rejected: PASSED");

        test_participation_counters($store).await;
        println!("  test_participation_counters: PASSED");

        test_point_balance_increments($store).await;
        println!("  test_point_balance_increments: PASSED");

        test_try_debit_points($store).await;
        println!("  test_try_debit_points: PASSED");

        test_concurrent_increments_are_not_lost($store).await;
        println!("  test_concurrent_increments_are_not_lost: PASSED");
    };
}
