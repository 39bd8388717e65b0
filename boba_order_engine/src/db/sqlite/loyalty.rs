use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LoyaltyAccount, LoyaltyTier, LoyaltyTransaction, LoyaltyTransactionType},
    traits::LoyaltyApiError,
};

/// Append one ledger entry and apply its delta to the cached balance, atomically with respect
/// to concurrent writers (the balance update is a single read-modify-write statement). The tier
/// is recomputed from the post-update balance.
///
/// This is the *only* balance-update path in the system. Order-driven grants and reversals,
/// point redemption at creation, and admin adjustments all come through here, each inside its
/// caller's transaction.
pub async fn append_and_apply(
    user_id: i64,
    order_id: Option<i64>,
    delta: i64,
    txn_type: LoyaltyTransactionType,
    description: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<LoyaltyAccount, LoyaltyApiError> {
    sqlx::query(
        r#"
        INSERT INTO loyalty_transactions (user_id, order_id, delta, txn_type, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(order_id)
    .bind(delta)
    .bind(txn_type)
    .bind(description)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    let balance: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO loyalty_accounts (user_id, balance, tier, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (user_id) DO UPDATE
        SET balance = loyalty_accounts.balance + ?2, updated_at = ?4
        RETURNING balance
        "#,
    )
    .bind(user_id)
    .bind(delta)
    .bind(LoyaltyTier::for_balance(delta))
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    let tier = LoyaltyTier::for_balance(balance);
    sqlx::query("UPDATE loyalty_accounts SET tier = ? WHERE user_id = ?")
        .bind(tier)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    trace!("⭐️ {txn_type} of {delta} points for user {user_id}. Balance is now {balance} ({tier})");
    Ok(LoyaltyAccount { user_id, balance, tier, updated_at: now })
}

pub async fn fetch_account(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<LoyaltyAccount>, LoyaltyApiError> {
    let account = sqlx::query_as::<_, LoyaltyAccount>(
        "SELECT user_id, balance, tier, updated_at FROM loyalty_accounts WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(account)
}

pub async fn history(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LoyaltyTransaction>, LoyaltyApiError> {
    let entries = sqlx::query_as::<_, LoyaltyTransaction>(
        "SELECT * FROM loyalty_transactions WHERE user_id = ? ORDER BY id DESC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(entries)
}

/// The sum of the user's ledger. Authoritative over the cached balance.
pub async fn ledger_sum(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, LoyaltyApiError> {
    let sum: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(delta), 0) FROM loyalty_transactions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(sum)
}

/// Overwrite the cached balance with the replayed ledger sum.
pub async fn write_balance(
    user_id: i64,
    balance: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<LoyaltyAccount, LoyaltyApiError> {
    let tier = LoyaltyTier::for_balance(balance);
    sqlx::query(
        r#"
        INSERT INTO loyalty_accounts (user_id, balance, tier, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (user_id) DO UPDATE
        SET balance = ?2, tier = ?3, updated_at = ?4
        "#,
    )
    .bind(user_id)
    .bind(balance)
    .bind(tier)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(LoyaltyAccount { user_id, balance, tier, updated_at: now })
}
