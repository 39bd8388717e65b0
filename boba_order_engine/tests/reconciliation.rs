//! Integration tests for the payment reconciliation state machine: exactly-once ledger effects
//! under duplicate, out-of-order and unknown provider outcomes.
mod support;

use boba_order_engine::{
    db_types::{FulfilmentStatus, LoyaltyTransactionType, PaymentOutcome, PaymentStatus},
    order_objects::NewOrderRequest,
    traits::{OrderFlowError, ReconcileResult, ShopDatabase},
    LoyaltyApi,
};
use support::*;

async fn placed_user_order(db: &boba_order_engine::SqliteDatabase, payment_ref: &str) -> boba_order_engine::db_types::Order {
    let api = order_flow_api(db);
    let placed = api.place_order(user_request("ada@example.com", 7)).await.unwrap();
    db.attach_payment_ref(placed.order.id, payment_ref).await.unwrap();
    placed.order
}

#[tokio::test]
async fn paid_outcome_settles_order_and_grants_points() {
    let db = new_test_db().await;
    let order = placed_user_order(&db, "tr_100").await;
    let api = order_flow_api(&db);
    let result = api.reconcile("tr_100", PaymentOutcome::Paid).await.unwrap();
    let ReconcileResult::Applied { order: updated } = result else {
        panic!("Expected the outcome to be applied");
    };
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert_eq!(updated.fulfilment_status, FulfilmentStatus::Paid);
    let loyalty = LoyaltyApi::new(db.clone());
    let account = loyalty.account(7).await.unwrap();
    assert_eq!(account.balance, order.points_earned);
    let history = loyalty.history(7).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].txn_type, LoyaltyTransactionType::Earn);
    assert_eq!(history[0].delta, order.points_earned);
}

#[tokio::test]
async fn replayed_paid_webhook_grants_points_exactly_once() {
    let db = new_test_db().await;
    let order = placed_user_order(&db, "tr_200").await;
    let api = order_flow_api(&db);
    api.reconcile("tr_200", PaymentOutcome::Paid).await.unwrap();
    // The provider redelivers. Twice, because real providers do that.
    for _ in 0..2 {
        let result = api.reconcile("tr_200", PaymentOutcome::Paid).await.unwrap();
        assert!(matches!(result, ReconcileResult::AlreadyFinal { .. }));
    }
    let loyalty = LoyaltyApi::new(db.clone());
    assert_eq!(loyalty.account(7).await.unwrap().balance, order.points_earned);
    assert_eq!(loyalty.history(7).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_outcome_cancels_and_restores_redeemed_points() {
    let db = new_test_db().await;
    let loyalty = LoyaltyApi::new(db.clone());
    loyalty.adjust(7, 500, "Welcome bonus").await.unwrap();
    let api = order_flow_api(&db);
    let req = NewOrderRequest { redeem_points: 200, ..user_request("ada@example.com", 7) };
    let placed = api.place_order(req).await.unwrap();
    db.attach_payment_ref(placed.order.id, "tr_300").await.unwrap();
    assert_eq!(loyalty.account(7).await.unwrap().balance, 300);

    let result = api.reconcile("tr_300", PaymentOutcome::Failed).await.unwrap();
    let ReconcileResult::Applied { order: updated } = result else {
        panic!("Expected the outcome to be applied");
    };
    assert_eq!(updated.payment_status, PaymentStatus::Failed);
    assert_eq!(updated.fulfilment_status, FulfilmentStatus::Cancelled);
    // Exactly the 200 redeemed points come back, in one ledger entry naming the order.
    assert_eq!(loyalty.account(7).await.unwrap().balance, 500);
    let history = loyalty.history(7).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].txn_type, LoyaltyTransactionType::Adjustment);
    assert_eq!(history[0].delta, 200);
    assert!(history[0].description.contains(placed.order.order_number.as_str()));
}

#[tokio::test]
async fn replayed_failure_does_not_restore_points_twice() {
    let db = new_test_db().await;
    let loyalty = LoyaltyApi::new(db.clone());
    loyalty.adjust(7, 500, "Welcome bonus").await.unwrap();
    let api = order_flow_api(&db);
    let req = NewOrderRequest { redeem_points: 200, ..user_request("ada@example.com", 7) };
    let placed = api.place_order(req).await.unwrap();
    db.attach_payment_ref(placed.order.id, "tr_400").await.unwrap();
    api.reconcile("tr_400", PaymentOutcome::Failed).await.unwrap();
    let result = api.reconcile("tr_400", PaymentOutcome::Failed).await.unwrap();
    assert!(matches!(result, ReconcileResult::AlreadyFinal { .. }));
    assert_eq!(loyalty.account(7).await.unwrap().balance, 500);
}

#[tokio::test]
async fn conflicting_outcome_after_terminal_status_is_a_noop() {
    let db = new_test_db().await;
    placed_user_order(&db, "tr_500").await;
    let api = order_flow_api(&db);
    api.reconcile("tr_500", PaymentOutcome::Paid).await.unwrap();
    // A stale "failed" delivery arrives after the payment already settled.
    let result = api.reconcile("tr_500", PaymentOutcome::Failed).await.unwrap();
    let ReconcileResult::AlreadyFinal { order } = result else {
        panic!("Expected the stale outcome to be absorbed");
    };
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.fulfilment_status, FulfilmentStatus::Paid);
}

#[tokio::test]
async fn unknown_outcomes_are_ignored_not_guessed_at() {
    let db = new_test_db().await;
    placed_user_order(&db, "tr_600").await;
    let api = order_flow_api(&db);
    let result = api.reconcile("tr_600", PaymentOutcome::Unknown).await.unwrap();
    let ReconcileResult::Ignored { order } = result else {
        panic!("Expected an unknown outcome to be ignored");
    };
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    // A real outcome afterwards still lands.
    let result = api.reconcile("tr_600", PaymentOutcome::Paid).await.unwrap();
    assert!(matches!(result, ReconcileResult::Applied { .. }));
}

#[tokio::test]
async fn unknown_payment_reference_is_an_error() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let err = api.reconcile("tr_nope", PaymentOutcome::Paid).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PaymentRefNotFound(_)));
}

#[tokio::test]
async fn guest_orders_never_touch_the_ledger() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let placed = api.place_order(guest_request("guest@example.com")).await.unwrap();
    db.attach_payment_ref(placed.order.id, "tr_700").await.unwrap();
    api.reconcile("tr_700", PaymentOutcome::Paid).await.unwrap();
    let entries: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM loyalty_transactions").fetch_one(db.pool()).await.unwrap();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn fulfilment_advances_only_after_payment() {
    let db = new_test_db().await;
    let order = placed_user_order(&db, "tr_800").await;
    let api = order_flow_api(&db);
    // Not paid yet: the barista cannot start it.
    let err = api.advance_fulfilment(&order.order_number).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::FulfilmentAdvanceForbidden(FulfilmentStatus::Pending)));
    api.reconcile("tr_800", PaymentOutcome::Paid).await.unwrap();
    let order = api.advance_fulfilment(&order.order_number).await.unwrap();
    assert_eq!(order.fulfilment_status, FulfilmentStatus::Preparing);
    let order = api.advance_fulfilment(&order.order_number).await.unwrap();
    assert_eq!(order.fulfilment_status, FulfilmentStatus::Ready);
    let order = api.advance_fulfilment(&order.order_number).await.unwrap();
    assert_eq!(order.fulfilment_status, FulfilmentStatus::Completed);
    let err = api.advance_fulfilment(&order.order_number).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::FulfilmentAdvanceForbidden(FulfilmentStatus::Completed)));
}
