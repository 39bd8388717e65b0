use std::fmt::Display;

use boba_order_engine::{db_types::OrderNumber, order_objects::CartItem, traits::PlacedOrder};
use bos_common::Cents;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The order-creation body as clients send it. Identity is deliberately absent here — the
/// authenticated user id comes from the upstream identity headers, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<CartItem>,
    pub promo_code: Option<String>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub email: String,
    #[serde(default)]
    pub redeem_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    pub order_id: i64,
    pub order_number: OrderNumber,
    pub subtotal: Cents,
    pub discount: Cents,
    pub total: Cents,
    pub points_earned: i64,
    pub points_redeemed: i64,
    /// Where to send the customer to complete payment.
    pub redirect_url: String,
}

impl OrderCreatedResponse {
    pub fn from_placed_order(placed: &PlacedOrder, redirect_url: String) -> Self {
        Self {
            order_id: placed.order.id,
            order_number: placed.order.order_number.clone(),
            subtotal: placed.order.subtotal,
            discount: placed.order.discount,
            total: placed.order.total,
            points_earned: placed.order.points_earned,
            points_redeemed: placed.order.points_redeemed,
            redirect_url,
        }
    }
}

/// The payment provider's webhook body. Nothing but the id is ever read; payment state is
/// re-fetched from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookPayload {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDisableRequest {
    pub date: NaiveDate,
    /// Slot labels, e.g. ["14:00", "14:15"].
    pub times: Vec<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkEnableRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyAdjustmentRequest {
    pub user_id: i64,
    /// Signed point delta.
    pub delta: i64,
    pub description: Option<String>,
}

/// Query parameters for guest order lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLookupParams {
    pub email: Option<String>,
}
