//! Core data types for the boba order engine.
//!
//! These types map 1:1 onto the database schema and are shared between the backend traits, the
//! public APIs and the server crate. Status columns store the enum variant names verbatim, so the
//! `FromStr`/`Display` pairs here are load-bearing, not cosmetic.
use std::{fmt::Display, str::FromStr};

use bos_common::Cents;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

// Display impls for fieldless enums are all the same shape.
macro_rules! fmt_variants {
    ($enum:ident => $($variant:ident),+) => {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let s = match self {
                $( $enum::$variant => stringify!($variant), )+
            };
            write!(f, "{s}")
        }
    };
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
/// The payment leg of an order's lifecycle. `Pending` transitions to exactly one of the terminal
/// states and never moves again; that terminality is the idempotency guard for webhook replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No outcome has been received from the payment provider yet.
    Pending,
    /// The provider reported the payment as settled.
    Paid,
    /// The provider reported the payment as failed, cancelled or expired.
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------  FulfilmentStatus   ---------------------------------------------------------
/// The kitchen-side leg of an order's lifecycle. Advances monotonically towards `Completed`;
/// `Cancelled` is terminal and only reachable from `Pending`/`Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum FulfilmentStatus {
    Pending,
    Paid,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl FulfilmentStatus {
    /// The next status in the happy path, or `None` from a terminal state.
    pub fn next(&self) -> Option<FulfilmentStatus> {
        use FulfilmentStatus::*;
        match self {
            Pending => Some(Paid),
            Paid => Some(Preparing),
            Preparing => Some(Ready),
            Ready => Some(Completed),
            Completed | Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FulfilmentStatus::Completed | FulfilmentStatus::Cancelled)
    }
}

impl Display for FulfilmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FulfilmentStatus::Pending => "Pending",
            FulfilmentStatus::Paid => "Paid",
            FulfilmentStatus::Preparing => "Preparing",
            FulfilmentStatus::Ready => "Ready",
            FulfilmentStatus::Completed => "Completed",
            FulfilmentStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FulfilmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Preparing" => Ok(Self::Preparing),
            "Ready" => Ok(Self::Ready),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid fulfilment status: {s}"))),
        }
    }
}

impl From<String> for FulfilmentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid fulfilment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            FulfilmentStatus::Pending
        })
    }
}

//--------------------------------------    OrderNumber      ---------------------------------------------------------
/// The human-readable order number printed on receipts and cups. Unique, generated at creation,
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    /// `None` for guest checkout.
    pub user_id: Option<i64>,
    pub customer_email: String,
    pub subtotal: Cents,
    pub discount: Cents,
    pub total: Cents,
    pub promo_code_id: Option<i64>,
    pub points_earned: i64,
    pub points_redeemed: i64,
    pub payment_status: PaymentStatus,
    pub fulfilment_status: FulfilmentStatus,
    pub payment_ref: Option<String>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single ordered line. `name`, `unit_price` and `customizations` are snapshots taken at order
/// time; a later catalog edit never changes what an existing order cost.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub name: String,
    pub unit_price: Cents,
    pub quantity: i64,
    /// JSON-encoded `Vec<CustomizationSnapshot>`.
    pub customizations: String,
    pub line_total: Cents,
}

impl OrderItem {
    pub fn customizations(&self) -> Result<Vec<CustomizationSnapshot>, serde_json::Error> {
        serde_json::from_str(&self.customizations)
    }
}

/// One chosen customization (an option or a topping) as it was priced at order time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomizationSnapshot {
    pub name: String,
    pub price: Cents,
}

//--------------------------------------      Catalog        ---------------------------------------------------------
/// The trusted price source for order creation. Catalog administration itself is out of scope;
/// these records are only ever *read* by the order pipeline.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Cents,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductOption {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub price_delta: Cents,
}

#[derive(Debug, Clone, FromRow)]
pub struct Topping {
    pub id: i64,
    pub name: String,
    pub price: Cents,
    pub active: bool,
}

//--------------------------------------     PromoCode       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DiscountType {
    /// `discount_value` is a percentage of the subtotal.
    Percentage,
    /// `discount_value` is an absolute amount in cents.
    Fixed,
}

#[derive(Debug, Clone, FromRow)]
pub struct PromoCode {
    pub id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Option<Cents>,
    pub max_uses: Option<i64>,
    pub used_count: i64,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Why a promo code was turned down. These all map to BAD_REQUEST at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoRejection {
    #[error("This promo code is not active")]
    Inactive,
    #[error("This promo code is not valid yet")]
    NotYetValid,
    #[error("This promo code has expired")]
    Expired,
    #[error("This promo code has reached its usage limit")]
    UsageCapReached,
    #[error("This promo code requires a minimum order of {0}")]
    BelowMinimumSpend(Cents),
}

impl PromoCode {
    /// Validate this code against a subtotal at a point in time and compute the discount.
    ///
    /// The computed discount is always clamped to the subtotal, so a fixed discount can never
    /// push a total negative. Redemption (the usage-counter increment) is *not* part of
    /// evaluation; it happens only when an order is durably created with the code attached.
    pub fn evaluate(&self, subtotal: Cents, now: DateTime<Utc>) -> Result<Cents, PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }
        if now < self.valid_from {
            return Err(PromoRejection::NotYetValid);
        }
        if now > self.valid_until {
            return Err(PromoRejection::Expired);
        }
        if let Some(cap) = self.max_uses {
            if self.used_count >= cap {
                return Err(PromoRejection::UsageCapReached);
            }
        }
        if let Some(min) = self.min_order_amount {
            if subtotal < min {
                return Err(PromoRejection::BelowMinimumSpend(min));
            }
        }
        let discount = match self.discount_type {
            DiscountType::Percentage => Cents::from(subtotal.value() * self.discount_value / 100),
            DiscountType::Fixed => Cents::from(self.discount_value),
        };
        Ok(discount.min(subtotal))
    }
}

//--------------------------------------  TimeSlotOverride   ---------------------------------------------------------
/// An administrative exception for a single (date, time) pickup slot. Absence of a row means the
/// slot is enabled at the store-wide default capacity.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeSlotOverride {
    pub id: i64,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub disabled: bool,
    pub capacity: Option<i64>,
    pub reason: Option<String>,
}

/// What the allocator reports for one slot on a given date.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotAvailability {
    /// The slot label, e.g. "14:30".
    pub time: String,
    pub capacity: i64,
    pub booked: i64,
    pub disabled: bool,
    pub reason: Option<String>,
}

impl SlotAvailability {
    pub fn is_available(&self) -> bool {
        !self.disabled && self.booked < self.capacity
    }
}

//--------------------------------------    Loyalty types    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
}

/// Tier thresholds are store policy, not structure. Keep them in this table so tuning them is a
/// one-line change; nothing else in the codebase may hard-code a threshold.
pub const TIER_THRESHOLDS: [(i64, LoyaltyTier); 3] =
    [(0, LoyaltyTier::Bronze), (500, LoyaltyTier::Silver), (1000, LoyaltyTier::Gold)];

impl LoyaltyTier {
    /// The tier for a given point balance. Pure and monotonic in the balance.
    pub fn for_balance(balance: i64) -> LoyaltyTier {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(min, _)| balance >= *min)
            .map(|(_, tier)| *tier)
            .unwrap_or(LoyaltyTier::Bronze)
    }
}

impl Display for LoyaltyTier {
    fmt_variants!(LoyaltyTier => Bronze, Silver, Gold);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LoyaltyTransactionType {
    /// Points granted for a paid order.
    Earn,
    /// Points spent against a reward at order creation.
    Redeem,
    /// A manual correction or restoration, posted by an admin or by cancellation flows.
    Adjustment,
}

/// One ledger entry. The ledger is append-only and is the source of truth for a user's balance;
/// the cached balance on [`LoyaltyAccount`] must always equal the sum of these deltas.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LoyaltyTransaction {
    pub id: i64,
    pub user_id: i64,
    pub order_id: Option<i64>,
    pub delta: i64,
    pub txn_type: LoyaltyTransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LoyaltyAccount {
    pub user_id: i64,
    pub balance: i64,
    pub tier: LoyaltyTier,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   StoreSettings     ---------------------------------------------------------
/// Per-weekday opening hours, Monday-first. `None` means closed that day. The close time is
/// exclusive: a store open 10:00–21:00 has its last 15-minute slot at 20:45.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours(pub [Option<(NaiveTime, NaiveTime)>; 7]);

impl OpeningHours {
    pub fn for_date(&self, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
        self.0[date.weekday().num_days_from_monday() as usize]
    }
}

/// The store-wide configuration singleton. Read-only from the order pipeline's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub default_slot_capacity: i64,
    pub slot_interval_minutes: i64,
    pub min_lead_minutes: i64,
    pub max_advance_days: i64,
    /// Points granted per whole currency unit (dollar) of a paid order's total.
    pub points_per_currency_unit: i64,
    /// The redemption value of a single point, in cents.
    pub cents_per_point: i64,
    pub opening_hours: OpeningHours,
}

impl Default for StoreSettings {
    // Matches the seed row in migrations/0002_default_settings.sql. Used when the settings
    // store is unreachable on a best-effort read path.
    fn default() -> Self {
        let weekday = Some((NaiveTime::from_hms_opt(10, 0, 0).unwrap(), NaiveTime::from_hms_opt(21, 0, 0).unwrap()));
        let friday = Some((NaiveTime::from_hms_opt(10, 0, 0).unwrap(), NaiveTime::from_hms_opt(22, 0, 0).unwrap()));
        let saturday = Some((NaiveTime::from_hms_opt(9, 0, 0).unwrap(), NaiveTime::from_hms_opt(22, 0, 0).unwrap()));
        let sunday = Some((NaiveTime::from_hms_opt(9, 0, 0).unwrap(), NaiveTime::from_hms_opt(20, 0, 0).unwrap()));
        Self {
            default_slot_capacity: 4,
            slot_interval_minutes: 15,
            min_lead_minutes: 30,
            max_advance_days: 7,
            points_per_currency_unit: 10,
            cents_per_point: 1,
            opening_hours: OpeningHours([weekday, weekday, weekday, weekday, friday, saturday, sunday]),
        }
    }
}

/// Why a requested pickup time was turned down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickupRejection {
    #[error("The store is closed on the requested day")]
    StoreClosed,
    #[error("Pickup times must fall on a {0}-minute slot boundary within opening hours")]
    NotOnSlotBoundary(i64),
    #[error("Pickup must be at least {0} minutes from now")]
    TooSoon(i64),
    #[error("Pickup cannot be scheduled more than {0} days in advance")]
    TooFarAhead(i64),
}

impl StoreSettings {
    /// All discrete pickup slot start times for a date, or an empty vector if the store is
    /// closed that day.
    pub fn slots_for_date(&self, date: NaiveDate) -> Vec<NaiveTime> {
        let Some((open, close)) = self.opening_hours.for_date(date) else {
            return Vec::new();
        };
        let mut slots = Vec::new();
        let mut t = open;
        while t < close {
            slots.push(t);
            t = t + chrono::Duration::minutes(self.slot_interval_minutes);
        }
        slots
    }

    /// Validate that a requested pickup instant is inside the booking policy window and lands on
    /// a slot boundary within opening hours.
    pub fn validate_pickup(&self, pickup: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), PickupRejection> {
        if pickup - now < chrono::Duration::minutes(self.min_lead_minutes) {
            return Err(PickupRejection::TooSoon(self.min_lead_minutes));
        }
        let days_ahead = (pickup.date_naive() - now.date_naive()).num_days();
        if days_ahead > self.max_advance_days {
            return Err(PickupRejection::TooFarAhead(self.max_advance_days));
        }
        let date = pickup.date_naive();
        let Some((open, close)) = self.opening_hours.for_date(date) else {
            return Err(PickupRejection::StoreClosed);
        };
        let time = pickup.time();
        if time < open || time >= close {
            return Err(PickupRejection::NotOnSlotBoundary(self.slot_interval_minutes));
        }
        let offset = (time - open).num_minutes();
        if offset % self.slot_interval_minutes != 0 || time.second() != 0 {
            return Err(PickupRejection::NotOnSlotBoundary(self.slot_interval_minutes));
        }
        Ok(())
    }

    /// Points earned on a paid order: `floor(total_in_currency_units * rate)`. Totals are held
    /// in cents, so this is a single integer division.
    pub fn points_for(&self, total: Cents) -> i64 {
        total.value() * self.points_per_currency_unit / 100
    }

    /// The discount value of redeeming `points` points.
    pub fn redemption_value(&self, points: i64) -> Cents {
        Cents::from(points * self.cents_per_point)
    }
}

//--------------------------------------   PaymentOutcome    ---------------------------------------------------------
/// A payment-provider outcome, already normalized from the provider's status vocabulary. The
/// reconciliation state machine only ever sees this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Paid,
    Failed,
    /// Anything the provider reports that is neither settled nor dead (open, processing, ...).
    /// Reconciliation ignores these rather than guessing.
    Unknown,
}

impl Display for DiscountType {
    fmt_variants!(DiscountType => Percentage, Fixed);
}

impl Display for LoyaltyTransactionType {
    fmt_variants!(LoyaltyTransactionType => Earn, Redeem, Adjustment);
}
