use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::PromoCode, traits::OrderFlowError};

/// Fetch a promo code record. The caller must normalize the code first; codes are stored
/// upper-cased.
pub async fn fetch_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<PromoCode>, OrderFlowError> {
    let promo = sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes WHERE code = ?")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(promo)
}

/// Consume one use of a promo code. The usage cap is enforced in the same statement that
/// increments, so two orders racing for the last use resolve to exactly one success. Returns
/// `false` if the cap was already reached (or the code was deactivated in the meantime).
pub async fn redeem(promo_id: i64, conn: &mut SqliteConnection) -> Result<bool, OrderFlowError> {
    let result = sqlx::query(
        r#"
        UPDATE promo_codes
        SET used_count = used_count + 1
        WHERE id = ? AND active = 1 AND (max_uses IS NULL OR used_count < max_uses)
        "#,
    )
    .bind(promo_id)
    .execute(&mut *conn)
    .await?;
    let applied = result.rows_affected() == 1;
    if applied {
        debug!("🎟️ Promo code #{promo_id} redeemed");
    }
    Ok(applied)
}
