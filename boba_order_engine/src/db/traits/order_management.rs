use crate::{
    db_types::{Order, OrderNumber, StoreSettings},
    traits::{OrderFlowError, PlacedOrder},
};

/// Read-side behaviour for orders and store configuration.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Fetch an order and its line snapshots by order number.
    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<PlacedOrder>, OrderFlowError>;

    /// All orders attributed to the given user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError>;

    /// The store settings singleton.
    async fn fetch_store_settings(&self) -> Result<StoreSettings, OrderFlowError>;
}
