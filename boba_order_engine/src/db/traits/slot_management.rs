use chrono::NaiveDate;

use crate::{
    db_types::{SlotAvailability, TimeSlotOverride},
    traits::{NewSlotOverride, OrderFlowError},
};

/// Behaviour for pickup-slot availability and administrative overrides.
///
/// All the admin operations are idempotent: disabling an already-disabled slot, or clearing an
/// override that does not exist, succeeds silently. The availability read is best-effort and may
/// be served from degraded data; the order creation transaction re-validates capacity
/// authoritatively at write time regardless.
#[allow(async_fn_in_trait)]
pub trait SlotManagement: Clone {
    /// For every discrete pickup time the store is open on `date`: the slot's effective
    /// capacity, the number of non-cancelled orders already booked into it, and whether an admin
    /// has disabled it.
    async fn day_availability(&self, date: NaiveDate) -> Result<Vec<SlotAvailability>, OrderFlowError>;

    /// Set (or replace) the override for a single slot. Returns the stored row.
    async fn upsert_override(&self, ovr: NewSlotOverride) -> Result<TimeSlotOverride, OrderFlowError>;

    /// Remove the override for a single slot, restoring default capacity. Succeeds silently if
    /// none exists.
    async fn clear_override(&self, date: NaiveDate, time: &str) -> Result<(), OrderFlowError>;

    /// Disable every slot in `times` for `date`, e.g. to absorb an unexpected rush. Capacity
    /// overrides already present on those slots are preserved. Returns the number of slots now
    /// disabled.
    async fn bulk_disable(&self, date: NaiveDate, times: &[String], reason: Option<&str>)
        -> Result<u64, OrderFlowError>;

    /// Re-enable `date` by clearing every disabling override on it. Overrides that only change
    /// capacity are left alone. Returns the number of overrides cleared.
    async fn bulk_enable(&self, date: NaiveDate) -> Result<u64, OrderFlowError>;
}
