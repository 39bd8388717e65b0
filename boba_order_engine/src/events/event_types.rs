use crate::db_types::Order;

/// Fired after a reconciliation commits a `Paid` outcome. The order row already reflects the
/// terminal state when subscribers see this.
#[derive(Debug, Clone)]
pub struct OrderPaidEvent {
    pub order: Order,
}

/// Fired after a reconciliation commits a failed/cancelled outcome.
#[derive(Debug, Clone)]
pub struct OrderAnnulledEvent {
    pub order: Order,
}
