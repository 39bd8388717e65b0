//! Unified API for the loyalty ledger.
use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{LoyaltyAccount, LoyaltyTier, LoyaltyTransaction},
    traits::{LoyaltyApiError, LoyaltyManagement},
};

/// The `LoyaltyApi` wraps a backend implementing [`LoyaltyManagement`].
pub struct LoyaltyApi<B> {
    db: B,
}

impl<B: Debug> Debug for LoyaltyApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoyaltyApi ({:?})", self.db)
    }
}

impl<B> LoyaltyApi<B>
where B: LoyaltyManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The account for `user_id`, or a zero-balance Bronze account if the user has no ledger
    /// history yet. Customers with no points are not an error.
    pub async fn account(&self, user_id: i64) -> Result<LoyaltyAccount, LoyaltyApiError> {
        let account = self.db.fetch_loyalty_account(user_id).await?.unwrap_or(LoyaltyAccount {
            user_id,
            balance: 0,
            tier: LoyaltyTier::Bronze,
            updated_at: Utc::now(),
        });
        Ok(account)
    }

    /// The user's ledger history, most recent first.
    pub async fn history(&self, user_id: i64) -> Result<Vec<LoyaltyTransaction>, LoyaltyApiError> {
        self.db.loyalty_history(user_id).await
    }

    /// Post an admin ADJUSTMENT (positive or negative) to a user's ledger. Uses the same atomic
    /// balance-update path as order-driven grants and reversals.
    pub async fn adjust(&self, user_id: i64, delta: i64, description: &str) -> Result<LoyaltyAccount, LoyaltyApiError> {
        if delta == 0 {
            return Err(LoyaltyApiError::ZeroAdjustment);
        }
        let account = self.db.post_adjustment(user_id, delta, description, Utc::now()).await?;
        info!("⭐️ Adjusted user {user_id} by {delta} points. Balance is now {}", account.balance);
        Ok(account)
    }

    /// Rebuild the cached balance for a user by replaying their ledger. For audit/repair.
    pub async fn rebuild_balance(&self, user_id: i64) -> Result<LoyaltyAccount, LoyaltyApiError> {
        let account = self.db.rebuild_balance(user_id, Utc::now()).await?;
        info!("⭐️ Rebuilt balance for user {user_id}: {} points ({})", account.balance, account.tier);
        Ok(account)
    }
}
