use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{LoyaltyAccount, LoyaltyTransaction};

/// Behaviour for the loyalty ledger and its cached balances.
///
/// The ledger is append-only; the cached balance on the account row is exactly the sum of the
/// user's ledger deltas, and every method here that writes does so with an atomic
/// read-modify-write so concurrent grants and reversals cannot lose updates. Order-driven
/// grants and reversals are *not* on this trait — they run inside the reconciliation
/// transaction on [`super::ShopDatabase`], through the same balance-update path.
#[allow(async_fn_in_trait)]
pub trait LoyaltyManagement: Clone {
    /// Fetch the loyalty account for the given user id. `None` if the user has never earned or
    /// been granted a point.
    async fn fetch_loyalty_account(&self, user_id: i64) -> Result<Option<LoyaltyAccount>, LoyaltyApiError>;

    /// The user's full ledger history, most recent first.
    async fn loyalty_history(&self, user_id: i64) -> Result<Vec<LoyaltyTransaction>, LoyaltyApiError>;

    /// Post a free-form ADJUSTMENT entry (positive or negative) outside the order flow, and
    /// atomically apply it to the cached balance. Returns the updated account.
    async fn post_adjustment(
        &self,
        user_id: i64,
        delta: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<LoyaltyAccount, LoyaltyApiError>;

    /// Recompute the cached balance by replaying the user's ledger, overwriting the cache.
    /// Used for auditing and repair; on a healthy database this is a no-op.
    async fn rebuild_balance(&self, user_id: i64, now: DateTime<Utc>) -> Result<LoyaltyAccount, LoyaltyApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum LoyaltyApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No loyalty account exists for user {0}")]
    AccountNotFound(i64),
    #[error("Insufficient points: the account holds {have} but {need} were requested")]
    InsufficientPoints { have: i64, need: i64 },
    #[error("Point adjustments cannot be zero")]
    ZeroAdjustment,
}

impl From<sqlx::Error> for LoyaltyApiError {
    fn from(e: sqlx::Error) -> Self {
        LoyaltyApiError::DatabaseError(e.to_string())
    }
}
