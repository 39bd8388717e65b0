use bos_common::Cents;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::catalog::PricedLine,
    db_types::{FulfilmentStatus, Order, OrderItem, OrderNumber, PaymentStatus},
    helpers::new_order_number,
    traits::OrderFlowError,
};

/// Everything the creation transaction has computed for an order, ready to persist. The order
/// number is allocated at insert time.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Option<i64>,
    pub customer_email: String,
    pub subtotal: Cents,
    pub discount: Cents,
    pub total: Cents,
    pub promo_code_id: Option<i64>,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub pickup_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert the order row, allocating a fresh order number. The UNIQUE index on `order_number` is
/// the arbiter; on the (vanishingly rare) collision we draw a new number and try again.
pub async fn insert_order(draft: OrderDraft, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    const MAX_ATTEMPTS: usize = 4;
    for attempt in 1..=MAX_ATTEMPTS {
        let order_number = new_order_number(draft.created_at, &mut rand::thread_rng());
        let result = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, user_id, customer_email, subtotal, discount, total,
                promo_code_id, points_earned, points_redeemed,
                payment_status, fulfilment_status, pickup_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&order_number)
        .bind(draft.user_id)
        .bind(&draft.customer_email)
        .bind(draft.subtotal)
        .bind(draft.discount)
        .bind(draft.total)
        .bind(draft.promo_code_id)
        .bind(draft.points_earned)
        .bind(draft.points_redeemed)
        .bind(PaymentStatus::Pending)
        .bind(FulfilmentStatus::Pending)
        .bind(draft.pickup_at)
        .bind(draft.created_at)
        .bind(draft.created_at)
        .fetch_one(&mut *conn)
        .await;
        match result {
            Ok(order) => {
                debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_number, order.id);
                return Ok(order);
            },
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() && attempt < MAX_ATTEMPTS => {
                debug!("🗃️ Order number {order_number} collided (attempt {attempt}). Drawing another");
            },
            Err(e) => return Err(e.into()),
        }
    }
    Err(OrderFlowError::DatabaseError("Could not allocate a unique order number".to_string()))
}

pub async fn insert_items(
    order_id: i64,
    lines: &[PricedLine],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, OrderFlowError> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let customizations = serde_json::to_string(&line.customizations)
            .map_err(|e| OrderFlowError::DatabaseError(format!("Could not serialize customizations: {e}")))?;
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (order_id, product_id, name, unit_price, quantity, customizations, line_total)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(customizations)
        .bind(line.line_total)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    Ok(items)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = ?")
        .bind(order_number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_payment_ref(
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_ref = ?")
        .bind(payment_ref)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, OrderFlowError> {
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ? ORDER BY id")
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderFlowError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(orders)
}

/// Non-cancelled orders booked into the slot window `[start, end)`. A cancelled order frees its
/// seat, so it is excluded here.
pub async fn count_in_slot(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, OrderFlowError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE pickup_at >= ? AND pickup_at < ? AND fulfilment_status <> ?",
    )
    .bind(start)
    .bind(end)
    .bind(FulfilmentStatus::Cancelled)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn set_payment_ref(
    order_id: i64,
    payment_ref: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    sqlx::query("UPDATE orders SET payment_ref = ?, updated_at = ? WHERE id = ?")
        .bind(payment_ref)
        .bind(now)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Move the order to a terminal payment status, guarded so it can only ever happen once.
/// Returns `false` if the order was already terminal — the caller treats that as a duplicate
/// delivery, not an error.
pub async fn mark_payment_outcome(
    order_id: i64,
    payment_status: PaymentStatus,
    fulfilment_status: FulfilmentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, OrderFlowError> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = ?, fulfilment_status = ?, updated_at = ? WHERE id = ? AND payment_status = ?",
    )
    .bind(payment_status)
    .bind(fulfilment_status)
    .bind(now)
    .bind(order_id)
    .bind(PaymentStatus::Pending)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_fulfilment_status(
    order_id: i64,
    status: FulfilmentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    sqlx::query("UPDATE orders SET fulfilment_status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
