//! Request and response shapes for the order flow API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The most bubble tea one order can carry. Catering-sized orders go through a human.
pub const MAX_ITEM_QUANTITY: i64 = 20;

/// One cart line as submitted by a client. Note what is *absent*: prices. Clients reference
/// catalog records by id and the server re-prices everything from stored data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub option_ids: Vec<i64>,
    #[serde(default)]
    pub topping_ids: Vec<i64>,
}

/// A fully described order-creation request, after the HTTP layer has attached the
/// authenticated identity (if any).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<CartItem>,
    pub promo_code: Option<String>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub customer_email: String,
    /// `None` for guest checkout. Guest orders earn no points and cannot redeem any.
    pub user_id: Option<i64>,
    /// Points to spend against this order as a discount. Only valid with a `user_id`.
    #[serde(default)]
    pub redeem_points: i64,
}
