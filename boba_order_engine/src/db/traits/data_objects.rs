use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem};

/// A durably created order together with its line snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// The result of feeding one payment outcome through the reconciliation state machine.
#[derive(Debug, Clone)]
pub enum ReconcileResult {
    /// The outcome was applied and the order moved to a terminal payment status. Ledger effects
    /// (point grant or restoration) committed in the same transaction.
    Applied { order: Order },
    /// The order's payment status was already terminal. Nothing was changed; this is the
    /// idempotency guard absorbing a duplicate webhook delivery.
    AlreadyFinal { order: Order },
    /// The outcome was not actionable (an open/processing/unknown provider status). Nothing was
    /// changed.
    Ignored { order: Order },
}

impl ReconcileResult {
    pub fn order(&self) -> &Order {
        match self {
            ReconcileResult::Applied { order } |
            ReconcileResult::AlreadyFinal { order } |
            ReconcileResult::Ignored { order } => order,
        }
    }
}

/// An administrative exception to write for a single slot. Writing one with `disabled = false`
/// and `capacity = None` is equivalent to clearing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlotOverride {
    pub slot_date: NaiveDate,
    /// The slot label, e.g. "14:30".
    pub slot_time: String,
    #[serde(default)]
    pub disabled: bool,
    pub capacity: Option<i64>,
    pub reason: Option<String>,
}
