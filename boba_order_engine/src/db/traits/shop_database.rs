use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{FulfilmentStatus, Order, OrderNumber, PaymentOutcome, PickupRejection, PromoRejection},
    order_objects::NewOrderRequest,
    traits::{LoyaltyApiError, PlacedOrder, ReconcileResult},
};

/// This trait defines the highest level of behaviour for backends supporting the order engine.
///
/// This behaviour includes:
/// * The order pricing & creation transaction: re-pricing a cart from trusted catalog data,
///   promo and loyalty adjustments, slot capacity consumption and durable persistence, all
///   atomically.
/// * Payment reconciliation: applying an external payment outcome to order and ledger state
///   exactly once.
/// * Fulfilment flow management.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: Clone + super::OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Price and persist a new order in a single atomic transaction.
    ///
    /// Every step of the pipeline runs against server-held data: catalog prices, promo state,
    /// loyalty balances and slot occupancy are all read inside the same transaction that writes
    /// the order. Either every effect (order row, line snapshots, promo counter increment,
    /// point redemption, implicit slot reservation) becomes visible, or none of them does.
    ///
    /// The slot capacity check is re-executed here regardless of any earlier availability read;
    /// two customers racing for the last seat in a slot must resolve to exactly one created
    /// order and one [`OrderFlowError::SlotFull`].
    async fn create_order(&self, req: NewOrderRequest, now: DateTime<Utc>) -> Result<PlacedOrder, OrderFlowError>;

    /// Record the payment provider's id for an order once a payment has been created for it.
    async fn attach_payment_ref(&self, order_id: i64, payment_ref: &str) -> Result<(), OrderFlowError>;

    /// Apply an external payment outcome to the order linked to `payment_ref`.
    ///
    /// If the order's payment status is already terminal this is a no-op with respect to status
    /// and ledger effects, and returns [`ReconcileResult::AlreadyFinal`]. Otherwise:
    /// * `Paid` marks the order paid and grants earned points (if the order is attributed to a
    ///   user and earned any) exactly once.
    /// * `Failed` cancels the order and restores redeemed points (if any) exactly once.
    /// * `Unknown` changes nothing and returns [`ReconcileResult::Ignored`].
    ///
    /// Status transition and ledger effect commit in the same transaction.
    async fn apply_payment_outcome(
        &self,
        payment_ref: &str,
        outcome: PaymentOutcome,
        now: DateTime<Utc>,
    ) -> Result<ReconcileResult, OrderFlowError>;

    /// Advance an order's fulfilment status one step along
    /// Paid → Preparing → Ready → Completed.
    ///
    /// Returns the updated order. Advancing from a terminal status, or from `Pending` (payment
    /// has not settled yet), is an error.
    async fn advance_fulfilment(&self, order_number: &OrderNumber, now: DateTime<Utc>)
        -> Result<Order, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

/// Everything that can go wrong in the order pipeline. The server maps these onto the HTTP
/// error taxonomy (not-found, bad-request, conflict, backend).
#[derive(Debug, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("No order is linked to payment reference {0}")]
    PaymentRefNotFound(String),
    #[error("Orders must contain at least one item")]
    EmptyOrder,
    #[error("Item quantities must be between 1 and {0}")]
    InvalidQuantity(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("{0} is not available right now")]
    ProductUnavailable(String),
    #[error("Option {option_id} is not valid for product {product_id}")]
    InvalidOption { product_id: i64, option_id: i64 },
    #[error("Topping {0} does not exist or is unavailable")]
    ToppingUnavailable(i64),
    #[error("Promo code {0} does not exist")]
    PromoCodeNotFound(String),
    #[error("{0}")]
    PromoRejected(#[from] PromoRejection),
    #[error("{0}")]
    PickupRejected(#[from] PickupRejection),
    #[error("The {time} slot on {date} is closed")]
    SlotDisabled { date: chrono::NaiveDate, time: String, reason: Option<String> },
    #[error("The {time} slot on {date} is fully booked")]
    SlotFull { date: chrono::NaiveDate, time: String },
    #[error("Guests cannot redeem loyalty points")]
    GuestRedemption,
    #[error("{0}")]
    LoyaltyError(#[from] LoyaltyApiError),
    #[error("Fulfilment cannot advance from {0}")]
    FulfilmentAdvanceForbidden(FulfilmentStatus),
    #[error("{0}")]
    ProviderError(#[from] super::PaymentProviderError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
