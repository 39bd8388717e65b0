#![allow(dead_code)]
//! Shared fixtures for the engine integration tests: a migrated in-memory database and a small
//! seeded catalog to price against.
use boba_order_engine::{
    events::EventProducers,
    order_objects::{CartItem, NewOrderRequest},
    OrderFlowApi,
    SqliteDatabase,
};
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use sqlx::SqlitePool;

pub const CLASSIC_MILK_TEA: i64 = 1;
pub const TARO_LATTE: i64 = 2;
pub const SEASONAL_SPECIAL: i64 = 3;
pub const OPT_LARGE: i64 = 1;
pub const OPT_HALF_SUGAR: i64 = 2;
pub const TOPPING_PEARLS: i64 = 1;
pub const TOPPING_GRASS_JELLY: i64 = 2;
pub const TOPPING_CHEESE_FOAM: i64 = 3;

/// A migrated in-memory database with the standard test catalog. A single pooled connection
/// keeps every query on the same in-memory instance.
pub async fn new_test_db() -> SqliteDatabase {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Failed to open in-memory database");
    seed_catalog(db.pool()).await;
    db
}

pub fn order_flow_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

async fn seed_catalog(pool: &SqlitePool) {
    // Prices in cents. The Seasonal Special is deliberately inactive.
    let products = [
        (CLASSIC_MILK_TEA, "Classic Milk Tea", 550, true),
        (TARO_LATTE, "Taro Latte", 625, true),
        (SEASONAL_SPECIAL, "Seasonal Special", 700, false),
    ];
    for (id, name, price, active) in products {
        sqlx::query("INSERT INTO products (id, name, price, active) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(price)
            .bind(active)
            .execute(pool)
            .await
            .expect("Failed to seed product");
    }
    let options = [
        (OPT_LARGE, CLASSIC_MILK_TEA, "Large", 75),
        (OPT_HALF_SUGAR, CLASSIC_MILK_TEA, "50% sugar", 0),
    ];
    for (id, product_id, name, price_delta) in options {
        sqlx::query("INSERT INTO product_options (id, product_id, name, price_delta) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(product_id)
            .bind(name)
            .bind(price_delta)
            .execute(pool)
            .await
            .expect("Failed to seed product option");
    }
    let toppings = [
        (TOPPING_PEARLS, "Tapioca Pearls", 60, true),
        (TOPPING_GRASS_JELLY, "Grass Jelly", 75, true),
        (TOPPING_CHEESE_FOAM, "Cheese Foam", 100, false),
    ];
    for (id, name, price, active) in toppings {
        sqlx::query("INSERT INTO toppings (id, name, price, active) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(price)
            .bind(active)
            .execute(pool)
            .await
            .expect("Failed to seed topping");
    }
}

/// Insert a promo code valid for a year either side of now, unlimited unless capped.
pub async fn insert_promo(
    pool: &SqlitePool,
    code: &str,
    discount_type: &str,
    value: i64,
    min_order_amount: Option<i64>,
    max_uses: Option<i64>,
) -> i64 {
    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO promo_codes (code, discount_type, discount_value, min_order_amount, max_uses, active, valid_from, valid_until)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?)
        RETURNING id
        "#,
    )
    .bind(code)
    .bind(discount_type)
    .bind(value)
    .bind(min_order_amount)
    .bind(max_uses)
    .bind(now - Duration::days(365))
    .bind(now + Duration::days(365))
    .fetch_one(pool)
    .await
    .expect("Failed to seed promo code");
    id
}

pub fn simple_item(product_id: i64, quantity: i64) -> CartItem {
    CartItem { product_id, quantity, option_ids: vec![], topping_ids: vec![] }
}

/// A guest request for one Taro Latte, no pickup slot.
pub fn guest_request(email: &str) -> NewOrderRequest {
    NewOrderRequest {
        items: vec![simple_item(TARO_LATTE, 1)],
        promo_code: None,
        pickup_at: None,
        customer_email: email.to_string(),
        user_id: None,
        redeem_points: 0,
    }
}

/// The same request attributed to an authenticated user.
pub fn user_request(email: &str, user_id: i64) -> NewOrderRequest {
    NewOrderRequest { user_id: Some(user_id), ..guest_request(email) }
}

/// A pickup instant two days out at the given slot time, safely inside the booking window.
pub fn pickup_in_two_days(time: &str) -> DateTime<Utc> {
    let date = (Utc::now() + Duration::days(2)).date_naive();
    let time = NaiveTime::parse_from_str(time, "%H:%M").expect("Bad slot label");
    NaiveDateTime::new(date, time).and_utc()
}
