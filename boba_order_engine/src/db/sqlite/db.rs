use std::{collections::HashMap, fmt::Debug};

use bos_common::Cents;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use crate::{
    db::sqlite::{catalog, loyalty, new_pool, orders, promos, settings, slots},
    db_types::{
        FulfilmentStatus,
        LoyaltyAccount,
        LoyaltyTransaction,
        LoyaltyTransactionType,
        Order,
        OrderNumber,
        PaymentOutcome,
        PaymentStatus,
        SlotAvailability,
        StoreSettings,
        TimeSlotOverride,
    },
    order_objects::NewOrderRequest,
    traits::{
        LoyaltyApiError,
        LoyaltyManagement,
        NewSlotOverride,
        OrderFlowError,
        OrderManagement,
        PlacedOrder,
        ReconcileResult,
        ShopDatabase,
        SlotManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Open (and migrate) the database at `url`.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, OrderFlowError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ShopDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, req: NewOrderRequest, now: DateTime<Utc>) -> Result<PlacedOrder, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let store = settings::fetch_store_settings(&mut tx).await?;
        // Steps 1-2: re-price every line from catalog data held server-side.
        let lines = catalog::price_cart(&req.items, &mut tx).await?;
        let subtotal: Cents = lines.iter().map(|l| l.line_total).sum();
        // Step 3: promo evaluation against the recomputed subtotal.
        let mut discount = Cents::ZERO;
        let mut promo_id = None;
        if let Some(code) = &req.promo_code {
            let promo = promos::fetch_by_code(code, &mut tx)
                .await?
                .ok_or_else(|| OrderFlowError::PromoCodeNotFound(code.clone()))?;
            discount = promo.evaluate(subtotal, now)?;
            promo_id = Some(promo.id);
        }
        // Loyalty redemption: authenticated users may spend points as a discount.
        let mut points_redeemed = 0;
        if req.redeem_points > 0 {
            let user_id = req.user_id.ok_or(OrderFlowError::GuestRedemption)?;
            let have = loyalty::fetch_account(user_id, &mut tx).await?.map(|a| a.balance).unwrap_or(0);
            if have < req.redeem_points {
                return Err(LoyaltyApiError::InsufficientPoints { have, need: req.redeem_points }.into());
            }
            discount = discount + store.redemption_value(req.redeem_points);
            points_redeemed = req.redeem_points;
        }
        let discount = discount.min(subtotal);
        let total = subtotal - discount;
        // Step 4 (policy half): the pickup instant must be inside the booking window and on the
        // slot grid. The capacity half runs after the insert, inside this same transaction.
        let mut slot_window = None;
        if let Some(pickup) = req.pickup_at {
            store.validate_pickup(pickup, now)?;
            let date = pickup.date_naive();
            let time = pickup.time().format("%H:%M").to_string();
            let ovr = slots::fetch_override(date, &time, &mut tx).await?;
            if let Some(o) = &ovr {
                if o.disabled {
                    return Err(OrderFlowError::SlotDisabled { date, time, reason: o.reason.clone() });
                }
            }
            let capacity = ovr.and_then(|o| o.capacity).unwrap_or(store.default_slot_capacity);
            let end = pickup + chrono::Duration::minutes(store.slot_interval_minutes);
            slot_window = Some((date, time, pickup, end, capacity));
        }
        // Step 6: only authenticated orders earn points.
        let points_earned = match req.user_id {
            Some(_) => store.points_for(total),
            None => 0,
        };
        // Step 7: persist. Everything below rides on this transaction; any error rolls the
        // whole order back.
        let draft = orders::OrderDraft {
            user_id: req.user_id,
            customer_email: req.customer_email.clone(),
            subtotal,
            discount,
            total,
            promo_code_id: promo_id,
            points_earned,
            points_redeemed,
            pickup_at: req.pickup_at,
            created_at: now,
        };
        let order = orders::insert_order(draft, &mut tx).await?;
        let items = orders::insert_items(order.id, &lines, &mut tx).await?;
        if points_redeemed > 0 {
            if let Some(user_id) = req.user_id {
                let description = format!("Points redeemed on order {}", order.order_number);
                loyalty::append_and_apply(
                    user_id,
                    Some(order.id),
                    -points_redeemed,
                    LoyaltyTransactionType::Redeem,
                    &description,
                    now,
                    &mut tx,
                )
                .await?;
            }
        }
        if let Some(promo_id) = promo_id {
            // The cap is re-checked by the guarded increment; evaluation earlier in this
            // transaction is advisory once concurrent orders enter the picture.
            if !promos::redeem(promo_id, &mut tx).await? {
                return Err(crate::db_types::PromoRejection::UsageCapReached.into());
            }
        }
        if let Some((date, time, start, end, capacity)) = slot_window {
            // Re-check occupancy now that our own row is in. Two requests racing for the last
            // seat both insert, but the loser counts past capacity here and rolls back.
            let booked = orders::count_in_slot(start, end, &mut tx).await?;
            if booked > capacity {
                return Err(OrderFlowError::SlotFull { date, time });
            }
        }
        tx.commit().await?;
        debug!("🗃️ Order {} committed: {} - {} = {}", order.order_number, subtotal, discount, total);
        Ok(PlacedOrder { order, items })
    }

    async fn attach_payment_ref(&self, order_id: i64, payment_ref: &str) -> Result<(), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_payment_ref(order_id, payment_ref, Utc::now(), &mut conn).await
    }

    async fn apply_payment_outcome(
        &self,
        payment_ref: &str,
        outcome: PaymentOutcome,
        now: DateTime<Utc>,
    ) -> Result<ReconcileResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_payment_ref(payment_ref, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentRefNotFound(payment_ref.to_string()))?;
        // Idempotency guard: a terminal payment status never moves again, and neither do the
        // ledger effects that shipped with it.
        if order.payment_status.is_terminal() {
            return Ok(ReconcileResult::AlreadyFinal { order });
        }
        let (payment_status, fulfilment_status) = match outcome {
            PaymentOutcome::Paid => (PaymentStatus::Paid, FulfilmentStatus::Paid),
            PaymentOutcome::Failed => (PaymentStatus::Failed, FulfilmentStatus::Cancelled),
            PaymentOutcome::Unknown => return Ok(ReconcileResult::Ignored { order }),
        };
        let applied = orders::mark_payment_outcome(order.id, payment_status, fulfilment_status, now, &mut tx).await?;
        if !applied {
            // Lost a race against a concurrent delivery. Same answer as the guard above, with
            // the freshly terminal row.
            let order = orders::fetch_order_by_payment_ref(payment_ref, &mut tx).await?.unwrap_or(order);
            return Ok(ReconcileResult::AlreadyFinal { order });
        }
        if let Some(user_id) = order.user_id {
            match outcome {
                PaymentOutcome::Paid if order.points_earned > 0 => {
                    let description = format!("Points earned on order {}", order.order_number);
                    loyalty::append_and_apply(
                        user_id,
                        Some(order.id),
                        order.points_earned,
                        LoyaltyTransactionType::Earn,
                        &description,
                        now,
                        &mut tx,
                    )
                    .await?;
                },
                PaymentOutcome::Failed if order.points_redeemed > 0 => {
                    let description = format!("Points restored for cancelled order {}", order.order_number);
                    loyalty::append_and_apply(
                        user_id,
                        Some(order.id),
                        order.points_redeemed,
                        LoyaltyTransactionType::Adjustment,
                        &description,
                        now,
                        &mut tx,
                    )
                    .await?;
                },
                _ => {},
            }
        }
        tx.commit().await?;
        let order = Order { payment_status, fulfilment_status, updated_at: now, ..order };
        Ok(ReconcileResult::Applied { order })
    }

    async fn advance_fulfilment(
        &self,
        order_number: &OrderNumber,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_number, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.clone()))?;
        // Pending means payment has not settled; that transition belongs to reconciliation.
        let next = match order.fulfilment_status {
            FulfilmentStatus::Pending => None,
            s => s.next(),
        }
        .ok_or(OrderFlowError::FulfilmentAdvanceForbidden(order.fulfilment_status))?;
        orders::set_fulfilment_status(order.id, next, now, &mut tx).await?;
        tx.commit().await?;
        Ok(Order { fulfilment_status: next, updated_at: now, ..order })
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<PlacedOrder>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order_by_number(order_number, &mut conn).await? else {
            return Ok(None);
        };
        let items = orders::fetch_items(order.id, &mut conn).await?;
        Ok(Some(PlacedOrder { order, items }))
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_user(user_id, &mut conn).await
    }

    async fn fetch_store_settings(&self) -> Result<StoreSettings, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        settings::fetch_store_settings(&mut conn).await
    }
}

impl SlotManagement for SqliteDatabase {
    async fn day_availability(&self, date: NaiveDate) -> Result<Vec<SlotAvailability>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        // Availability is best-effort: degrade to defaults rather than failing the page. The
        // creation transaction is the authoritative check.
        let store = match settings::fetch_store_settings(&mut conn).await {
            Ok(s) => s,
            Err(e) => {
                warn!("🕒️ Store settings unreachable ({e}). Using defaults for availability");
                StoreSettings::default()
            },
        };
        let overrides = match slots::fetch_overrides_for_date(date, &mut conn).await {
            Ok(o) => o,
            Err(e) => {
                warn!("🕒️ Slot overrides unreachable ({e}). Assuming none");
                Vec::new()
            },
        };
        let overrides: HashMap<String, TimeSlotOverride> =
            overrides.into_iter().map(|o| (o.slot_time.clone(), o)).collect();
        let mut result = Vec::new();
        for slot in store.slots_for_date(date) {
            let time = slot.format("%H:%M").to_string();
            let start = NaiveDateTime::new(date, slot).and_utc();
            let end = start + chrono::Duration::minutes(store.slot_interval_minutes);
            let booked = match orders::count_in_slot(start, end, &mut conn).await {
                Ok(n) => n,
                Err(e) => {
                    warn!("🕒️ Could not count bookings for {date} {time} ({e}). Reporting zero");
                    0
                },
            };
            let ovr = overrides.get(&time);
            result.push(SlotAvailability {
                time,
                capacity: ovr.and_then(|o| o.capacity).unwrap_or(store.default_slot_capacity),
                booked,
                disabled: ovr.map(|o| o.disabled).unwrap_or(false),
                reason: ovr.and_then(|o| o.reason.clone()),
            });
        }
        Ok(result)
    }

    async fn upsert_override(&self, ovr: NewSlotOverride) -> Result<TimeSlotOverride, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        slots::upsert_override(&ovr, &mut conn).await
    }

    async fn clear_override(&self, date: NaiveDate, time: &str) -> Result<(), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        slots::delete_override(date, time, &mut conn).await
    }

    async fn bulk_disable(
        &self,
        date: NaiveDate,
        times: &[String],
        reason: Option<&str>,
    ) -> Result<u64, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let n = slots::bulk_disable(date, times, reason, &mut tx).await?;
        tx.commit().await?;
        Ok(n)
    }

    async fn bulk_enable(&self, date: NaiveDate) -> Result<u64, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let n = slots::bulk_enable(date, &mut tx).await?;
        tx.commit().await?;
        Ok(n)
    }
}

impl LoyaltyManagement for SqliteDatabase {
    async fn fetch_loyalty_account(&self, user_id: i64) -> Result<Option<LoyaltyAccount>, LoyaltyApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LoyaltyApiError::DatabaseError(e.to_string()))?;
        loyalty::fetch_account(user_id, &mut conn).await
    }

    async fn loyalty_history(&self, user_id: i64) -> Result<Vec<LoyaltyTransaction>, LoyaltyApiError> {
        let mut conn = self.pool.acquire().await.map_err(|e| LoyaltyApiError::DatabaseError(e.to_string()))?;
        loyalty::history(user_id, &mut conn).await
    }

    async fn post_adjustment(
        &self,
        user_id: i64,
        delta: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<LoyaltyAccount, LoyaltyApiError> {
        let mut tx = self.pool.begin().await.map_err(|e| LoyaltyApiError::DatabaseError(e.to_string()))?;
        let account =
            loyalty::append_and_apply(user_id, None, delta, LoyaltyTransactionType::Adjustment, description, now, &mut tx)
                .await?;
        tx.commit().await.map_err(|e| LoyaltyApiError::DatabaseError(e.to_string()))?;
        Ok(account)
    }

    async fn rebuild_balance(&self, user_id: i64, now: DateTime<Utc>) -> Result<LoyaltyAccount, LoyaltyApiError> {
        let mut tx = self.pool.begin().await.map_err(|e| LoyaltyApiError::DatabaseError(e.to_string()))?;
        let balance = loyalty::ledger_sum(user_id, &mut tx).await?;
        let account = loyalty::write_balance(user_id, balance, now, &mut tx).await?;
        tx.commit().await.map_err(|e| LoyaltyApiError::DatabaseError(e.to_string()))?;
        Ok(account)
    }
}
