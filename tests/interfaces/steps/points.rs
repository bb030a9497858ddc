//! Point transfer step definitions.

use cucumber::{then, when};
use sopha::clock::Clock;
use sopha::points::{balance, transfer_points, PointsError, TransferRequest};

use super::AttendanceWorld;

#[when(expr = "{string} transfers {int} points to {string} with note {string}")]
async fn when_transfer(
    world: &mut AttendanceWorld,
    from: String,
    amount: i64,
    to: String,
    note: String,
) {
    let request = TransferRequest::new(from.clone(), to, amount, note);
    let at = world.clock.now().fixed_offset();
    let store = world.store();
    world.last_transfer =
        Some(transfer_points(store.as_ref(), &request, Some(from.as_str()), at).await);
}

#[then("the transfer succeeds")]
async fn then_transfer_succeeds(world: &mut AttendanceWorld) {
    let result = world.last_transfer.as_ref().expect("No transfer ran");
    assert!(result.is_ok(), "expected success, got {:?}", result);
}

#[then("the transfer is refused for insufficient points")]
async fn then_transfer_refused(world: &mut AttendanceWorld) {
    let result = world.last_transfer.as_ref().expect("No transfer ran");
    assert!(
        matches!(result, Err(PointsError::InsufficientPoints { .. })),
        "expected insufficient points, got {:?}",
        result
    );
}

#[then("the transfer is refused as invalid")]
async fn then_transfer_invalid(world: &mut AttendanceWorld) {
    let result = world.last_transfer.as_ref().expect("No transfer ran");
    assert!(
        matches!(
            result,
            Err(PointsError::InvalidAmount(_)) | Err(PointsError::SameEmployee(_))
        ),
        "expected validation error, got {:?}",
        result
    );
}

#[then(expr = "the balance of {string} is {int}")]
async fn then_balance(world: &mut AttendanceWorld, employee: String, expected: i64) {
    let store = world.store();
    let total = balance(store.as_ref(), &employee)
        .await
        .expect("Failed to read balance");
    assert_eq!(total, expected, "balance of {}", employee);
}

#[then(expr = "the latest ledger row of {string} reads {string}")]
async fn then_ledger_reason(world: &mut AttendanceWorld, employee: String, reason: String) {
    let rows = world
        .store()
        .ledger_for_employee(&employee)
        .await
        .expect("Failed to read ledger");
    let last = rows.last().expect("Ledger is empty");
    assert_eq!(last.reason, reason);
}
