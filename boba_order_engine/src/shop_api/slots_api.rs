//! Unified API for pickup-slot availability and administration.
use std::fmt::Debug;

use chrono::NaiveDate;
use log::*;

use crate::{
    db_types::{SlotAvailability, TimeSlotOverride},
    traits::{NewSlotOverride, OrderFlowError, SlotManagement},
};

/// The `SlotApi` wraps a backend implementing [`SlotManagement`].
pub struct SlotApi<B> {
    db: B,
}

impl<B: Debug> Debug for SlotApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SlotApi ({:?})", self.db)
    }
}

impl<B> SlotApi<B>
where B: SlotManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Availability for every slot the store is open on `date`. Best-effort: the backend
    /// degrades to defaults if override metadata is unreachable. The creation transaction
    /// re-validates at write time, so a too-optimistic answer here costs a CONFLICT later, not
    /// an overbooked slot.
    pub async fn day_availability(&self, date: NaiveDate) -> Result<Vec<SlotAvailability>, OrderFlowError> {
        self.db.day_availability(date).await
    }

    pub async fn set_override(&self, ovr: NewSlotOverride) -> Result<TimeSlotOverride, OrderFlowError> {
        info!("🕒️ Setting override for {} {}: disabled={}, capacity={:?}", ovr.slot_date, ovr.slot_time, ovr.disabled, ovr.capacity);
        self.db.upsert_override(ovr).await
    }

    pub async fn clear_override(&self, date: NaiveDate, time: &str) -> Result<(), OrderFlowError> {
        info!("🕒️ Clearing override for {date} {time}");
        self.db.clear_override(date, time).await
    }

    /// Disable a set of slots for a date in one call. Idempotent.
    pub async fn bulk_disable(
        &self,
        date: NaiveDate,
        times: &[String],
        reason: Option<&str>,
    ) -> Result<u64, OrderFlowError> {
        let n = self.db.bulk_disable(date, times, reason).await?;
        info!("🕒️ Disabled {n} slot(s) on {date}");
        Ok(n)
    }

    /// Clear every disabling override for a date in one call. Idempotent.
    pub async fn bulk_enable(&self, date: NaiveDate) -> Result<u64, OrderFlowError> {
        let n = self.db.bulk_enable(date).await?;
        info!("🕒️ Re-enabled {n} slot(s) on {date}");
        Ok(n)
    }
}
