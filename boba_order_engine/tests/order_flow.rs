//! Integration tests for the order pricing & creation transaction.
mod support;

use boba_order_engine::{
    db_types::{FulfilmentStatus, PaymentOutcome, PaymentStatus, PickupRejection, PromoRejection},
    order_objects::{CartItem, NewOrderRequest},
    traits::{LoyaltyApiError, NewSlotOverride, OrderFlowError, ShopDatabase, SlotManagement},
    LoyaltyApi,
};
use bos_common::Cents;
use chrono::{Duration, TimeZone, Utc};
use support::*;

#[tokio::test]
async fn totals_are_recomputed_from_catalog_prices() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest {
        items: vec![
            CartItem {
                product_id: CLASSIC_MILK_TEA,
                quantity: 2,
                option_ids: vec![OPT_LARGE],
                topping_ids: vec![TOPPING_PEARLS],
            },
            simple_item(TARO_LATTE, 1),
        ],
        ..user_request("ada@example.com", 42)
    };
    let placed = api.place_order(req).await.unwrap();
    // Classic (550) + Large (75) + Pearls (60) = 685/unit, two units, plus one Taro at 625.
    assert_eq!(placed.order.subtotal, Cents::from(1995));
    assert_eq!(placed.order.discount, Cents::ZERO);
    assert_eq!(placed.order.total, Cents::from(1995));
    assert_eq!(placed.order.total, placed.order.subtotal - placed.order.discount);
    assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
    assert_eq!(placed.order.fulfilment_status, FulfilmentStatus::Pending);
    assert_eq!(placed.items.len(), 2);
    assert_eq!(placed.items[0].unit_price, Cents::from(685));
    assert_eq!(placed.items[0].line_total, Cents::from(1370));
    let customizations = placed.items[0].customizations().unwrap();
    assert_eq!(customizations.len(), 2);
    assert_eq!(customizations[0].name, "Large");
    // 10 points per dollar on $19.95.
    assert_eq!(placed.order.points_earned, 199);
}

#[tokio::test]
async fn line_snapshots_survive_catalog_edits() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let placed = api.place_order(user_request("ada@example.com", 1)).await.unwrap();
    assert_eq!(placed.items[0].unit_price, Cents::from(625));
    // The shop raises the Taro Latte price after the order is in.
    sqlx::query("UPDATE products SET price = 9999 WHERE id = ?")
        .bind(TARO_LATTE)
        .execute(db.pool())
        .await
        .unwrap();
    let refetched = api.order_by_number(&placed.order.order_number).await.unwrap().unwrap();
    assert_eq!(refetched.items[0].unit_price, Cents::from(625));
    assert_eq!(refetched.order.total, Cents::from(625));
}

#[tokio::test]
async fn missing_product_aborts_the_whole_order() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest {
        items: vec![simple_item(TARO_LATTE, 1), simple_item(999, 1)],
        ..guest_request("ada@example.com")
    };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProductNotFound(999)));
    // No partial order was created.
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn inactive_product_is_rejected() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let req =
        NewOrderRequest { items: vec![simple_item(SEASONAL_SPECIAL, 1)], ..guest_request("ada@example.com") };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProductUnavailable(name) if name == "Seasonal Special"));
}

#[tokio::test]
async fn inactive_topping_is_rejected() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest {
        items: vec![CartItem {
            product_id: TARO_LATTE,
            quantity: 1,
            option_ids: vec![],
            topping_ids: vec![TOPPING_CHEESE_FOAM],
        }],
        ..guest_request("ada@example.com")
    };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ToppingUnavailable(id) if id == TOPPING_CHEESE_FOAM));
}

#[tokio::test]
async fn option_must_belong_to_the_product() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    // "Large" is a Classic Milk Tea option; it cannot price a Taro Latte.
    let req = NewOrderRequest {
        items: vec![CartItem { product_id: TARO_LATTE, quantity: 1, option_ids: vec![OPT_LARGE], topping_ids: vec![] }],
        ..guest_request("ada@example.com")
    };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidOption { .. }));
}

#[tokio::test]
async fn percentage_promo_is_applied_to_recomputed_subtotal() {
    let db = new_test_db().await;
    insert_promo(db.pool(), "BOBA10", "Percentage", 10, None, None).await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest {
        items: vec![simple_item(TARO_LATTE, 2)],
        promo_code: Some("boba10".to_string()),
        ..guest_request("ada@example.com")
    };
    let placed = api.place_order(req).await.unwrap();
    assert_eq!(placed.order.subtotal, Cents::from(1250));
    assert_eq!(placed.order.discount, Cents::from(125));
    assert_eq!(placed.order.total, Cents::from(1125));
}

#[tokio::test]
async fn fixed_promo_never_pushes_total_negative() {
    let db = new_test_db().await;
    insert_promo(db.pool(), "TENBUCKS", "Fixed", 1000, None, None).await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest {
        items: vec![simple_item(CLASSIC_MILK_TEA, 1)],
        promo_code: Some("TENBUCKS".to_string()),
        ..guest_request("ada@example.com")
    };
    let placed = api.place_order(req).await.unwrap();
    assert_eq!(placed.order.subtotal, Cents::from(550));
    assert_eq!(placed.order.discount, Cents::from(550));
    assert_eq!(placed.order.total, Cents::ZERO);
}

#[tokio::test]
async fn promo_usage_cap_is_not_overrun() {
    let db = new_test_db().await;
    let promo_id = insert_promo(db.pool(), "ONCEONLY", "Fixed", 100, None, Some(1)).await;
    let api = order_flow_api(&db);
    let with_promo = |email: &str| NewOrderRequest {
        promo_code: Some("ONCEONLY".to_string()),
        ..guest_request(email)
    };
    api.place_order(with_promo("first@example.com")).await.unwrap();
    let err = api.place_order(with_promo("second@example.com")).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PromoRejected(PromoRejection::UsageCapReached)));
    let used: i64 =
        sqlx::query_scalar("SELECT used_count FROM promo_codes WHERE id = ?").bind(promo_id).fetch_one(db.pool()).await.unwrap();
    assert_eq!(used, 1);
}

#[tokio::test]
async fn promo_below_minimum_spend_is_rejected() {
    let db = new_test_db().await;
    insert_promo(db.pool(), "BIGSPENDER", "Percentage", 15, Some(5000), None).await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest { promo_code: Some("BIGSPENDER".to_string()), ..guest_request("a@b.c") };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PromoRejected(PromoRejection::BelowMinimumSpend(_))));
}

#[tokio::test]
async fn unknown_promo_code_is_not_found() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest { promo_code: Some("NOSUCH".to_string()), ..guest_request("a@b.c") };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PromoCodeNotFound(_)));
}

#[tokio::test]
async fn guest_orders_earn_no_points() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let placed = api.place_order(guest_request("guest@example.com")).await.unwrap();
    assert_eq!(placed.order.points_earned, 0);
    assert_eq!(placed.order.user_id, None);
}

#[tokio::test]
async fn guests_cannot_redeem_points() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let req = NewOrderRequest { redeem_points: 100, ..guest_request("guest@example.com") };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::GuestRedemption));
}

#[tokio::test]
async fn redemption_debits_the_ledger_inside_the_creation_transaction() {
    let db = new_test_db().await;
    let loyalty = LoyaltyApi::new(db.clone());
    loyalty.adjust(7, 500, "Welcome bonus").await.unwrap();
    let api = order_flow_api(&db);
    let req = NewOrderRequest { redeem_points: 200, ..user_request("ada@example.com", 7) };
    let placed = api.place_order(req).await.unwrap();
    assert_eq!(placed.order.points_redeemed, 200);
    // 200 points at 1c each knock $2.00 off the $6.25 latte.
    assert_eq!(placed.order.discount, Cents::from(200));
    assert_eq!(placed.order.total, Cents::from(425));
    let account = loyalty.account(7).await.unwrap();
    assert_eq!(account.balance, 300);
    let history = loyalty.history(7).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].delta, -200);
    assert_eq!(history[0].order_id, Some(placed.order.id));
}

#[tokio::test]
async fn redemption_beyond_balance_is_rejected_and_rolls_back() {
    let db = new_test_db().await;
    let loyalty = LoyaltyApi::new(db.clone());
    loyalty.adjust(7, 100, "Welcome bonus").await.unwrap();
    let api = order_flow_api(&db);
    let req = NewOrderRequest { redeem_points: 200, ..user_request("ada@example.com", 7) };
    let err = api.place_order(req).await.unwrap_err();
    assert!(matches!(
        err,
        OrderFlowError::LoyaltyError(LoyaltyApiError::InsufficientPoints { have: 100, need: 200 })
    ));
    assert_eq!(loyalty.account(7).await.unwrap().balance, 100);
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn pickup_policy_window_is_enforced() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let too_soon = NewOrderRequest {
        pickup_at: Some(Utc::now() + Duration::minutes(5)),
        ..guest_request("ada@example.com")
    };
    let err = api.place_order(too_soon).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PickupRejected(PickupRejection::TooSoon(_))));

    let too_far = NewOrderRequest {
        pickup_at: Some(pickup_in_two_days("14:30") + Duration::days(30)),
        ..guest_request("ada@example.com")
    };
    let err = api.place_order(too_far).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PickupRejected(PickupRejection::TooFarAhead(_))));

    let off_grid = NewOrderRequest {
        pickup_at: Some(pickup_in_two_days("14:37")),
        ..guest_request("ada@example.com")
    };
    let err = api.place_order(off_grid).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PickupRejected(PickupRejection::NotOnSlotBoundary(_))));
}

#[tokio::test]
async fn last_seat_in_a_slot_is_not_double_booked() {
    let db = new_test_db().await;
    // Use a fixed clock so the slot date is deterministic: bookings for Monday 2027-03-01.
    let now = Utc.with_ymd_and_hms(2027, 2, 27, 9, 0, 0).unwrap();
    let pickup = Utc.with_ymd_and_hms(2027, 3, 1, 14, 30, 0).unwrap();
    let date = pickup.date_naive();
    db.upsert_override(NewSlotOverride {
        slot_date: date,
        slot_time: "14:30".to_string(),
        disabled: false,
        capacity: Some(2),
        reason: None,
    })
    .await
    .unwrap();
    let order = |email: &str| NewOrderRequest { pickup_at: Some(pickup), ..guest_request(email) };
    db.create_order(order("one@example.com"), now).await.unwrap();
    db.create_order(order("two@example.com"), now).await.unwrap();
    let err = db.create_order(order("three@example.com"), now).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::SlotFull { .. }));
    // The loser's order must not exist at all.
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(orders, 2);
}

#[tokio::test]
async fn cancelled_orders_free_their_slot() {
    let db = new_test_db().await;
    let now = Utc.with_ymd_and_hms(2027, 2, 27, 9, 0, 0).unwrap();
    let pickup = Utc.with_ymd_and_hms(2027, 3, 1, 10, 0, 0).unwrap();
    db.upsert_override(NewSlotOverride {
        slot_date: pickup.date_naive(),
        slot_time: "10:00".to_string(),
        disabled: false,
        capacity: Some(1),
        reason: None,
    })
    .await
    .unwrap();
    let order = |email: &str| NewOrderRequest { pickup_at: Some(pickup), ..guest_request(email) };
    let first = db.create_order(order("one@example.com"), now).await.unwrap();
    let err = db.create_order(order("two@example.com"), now).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::SlotFull { .. }));
    // The first customer's payment falls through; their seat opens up again.
    db.attach_payment_ref(first.order.id, "tr_first").await.unwrap();
    db.apply_payment_outcome("tr_first", PaymentOutcome::Failed, now).await.unwrap();
    db.create_order(order("two@example.com"), now).await.unwrap();
}

#[tokio::test]
async fn disabled_slot_rejects_orders() {
    let db = new_test_db().await;
    let now = Utc.with_ymd_and_hms(2027, 2, 27, 9, 0, 0).unwrap();
    let pickup = Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 0).unwrap();
    db.bulk_disable(pickup.date_naive(), &["12:00".to_string()], Some("Staff training")).await.unwrap();
    let req = NewOrderRequest { pickup_at: Some(pickup), ..guest_request("ada@example.com") };
    let err = db.create_order(req, now).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::SlotDisabled { reason: Some(r), .. } if r == "Staff training"));
}

#[tokio::test]
async fn email_is_stored_normalized() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let placed = api.place_order(guest_request("  Ada@Example.COM ")).await.unwrap();
    assert_eq!(placed.order.customer_email, "ada@example.com");
}

#[tokio::test]
async fn empty_and_absurd_carts_are_rejected() {
    let db = new_test_db().await;
    let api = order_flow_api(&db);
    let empty = NewOrderRequest { items: vec![], ..guest_request("a@b.c") };
    assert!(matches!(api.place_order(empty).await.unwrap_err(), OrderFlowError::EmptyOrder));
    let zero_qty = NewOrderRequest { items: vec![simple_item(TARO_LATTE, 0)], ..guest_request("a@b.c") };
    assert!(matches!(api.place_order(zero_qty).await.unwrap_err(), OrderFlowError::InvalidQuantity(_)));
}
