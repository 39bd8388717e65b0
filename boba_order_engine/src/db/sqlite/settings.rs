use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{OpeningHours, StoreSettings},
    traits::OrderFlowError,
};

#[derive(Debug, Clone, FromRow)]
struct StoreSettingsRow {
    default_slot_capacity: i64,
    slot_interval_minutes: i64,
    min_lead_minutes: i64,
    max_advance_days: i64,
    points_per_currency_unit: i64,
    cents_per_point: i64,
    opening_hours: String,
}

/// Fetch the settings singleton. A missing row or unparseable opening-hours column is a
/// backend error; callers on best-effort read paths substitute [`StoreSettings::default`].
pub async fn fetch_store_settings(conn: &mut SqliteConnection) -> Result<StoreSettings, OrderFlowError> {
    let row = sqlx::query_as::<_, StoreSettingsRow>("SELECT * FROM store_settings WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| OrderFlowError::DatabaseError("The store settings singleton is missing".to_string()))?;
    let opening_hours: OpeningHours = serde_json::from_str(&row.opening_hours)
        .map_err(|e| OrderFlowError::DatabaseError(format!("Could not parse opening hours: {e}")))?;
    Ok(StoreSettings {
        default_slot_capacity: row.default_slot_capacity,
        slot_interval_minutes: row.slot_interval_minutes,
        min_lead_minutes: row.min_lead_minutes,
        max_advance_days: row.max_advance_days,
        points_per_currency_unit: row.points_per_currency_unit,
        cents_per_point: row.cents_per_point,
        opening_hours,
    })
}
