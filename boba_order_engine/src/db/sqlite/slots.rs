use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::{
    db_types::TimeSlotOverride,
    traits::{NewSlotOverride, OrderFlowError},
};

pub async fn fetch_override(
    date: NaiveDate,
    time: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TimeSlotOverride>, OrderFlowError> {
    let ovr = sqlx::query_as::<_, TimeSlotOverride>(
        "SELECT id, slot_date, slot_time, disabled, capacity, reason FROM time_slot_overrides WHERE slot_date = ? AND slot_time = ?",
    )
    .bind(date)
    .bind(time)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(ovr)
}

pub async fn fetch_overrides_for_date(
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Vec<TimeSlotOverride>, OrderFlowError> {
    let overrides = sqlx::query_as::<_, TimeSlotOverride>(
        "SELECT id, slot_date, slot_time, disabled, capacity, reason FROM time_slot_overrides WHERE slot_date = ? ORDER BY slot_time",
    )
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;
    Ok(overrides)
}

/// Insert or replace the override for one slot.
pub async fn upsert_override(
    ovr: &NewSlotOverride,
    conn: &mut SqliteConnection,
) -> Result<TimeSlotOverride, OrderFlowError> {
    let stored = sqlx::query_as::<_, TimeSlotOverride>(
        r#"
        INSERT INTO time_slot_overrides (slot_date, slot_time, disabled, capacity, reason)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (slot_date, slot_time) DO UPDATE
        SET disabled = excluded.disabled, capacity = excluded.capacity, reason = excluded.reason
        RETURNING id, slot_date, slot_time, disabled, capacity, reason
        "#,
    )
    .bind(ovr.slot_date)
    .bind(&ovr.slot_time)
    .bind(ovr.disabled)
    .bind(ovr.capacity)
    .bind(&ovr.reason)
    .fetch_one(&mut *conn)
    .await?;
    Ok(stored)
}

/// Delete the override for one slot. Idempotent: deleting a non-existent override is a no-op.
pub async fn delete_override(date: NaiveDate, time: &str, conn: &mut SqliteConnection) -> Result<(), OrderFlowError> {
    sqlx::query("DELETE FROM time_slot_overrides WHERE slot_date = ? AND slot_time = ?")
        .bind(date)
        .bind(time)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Disable each listed slot, preserving any capacity override already present. Disabling an
/// already-disabled slot succeeds silently.
pub async fn bulk_disable(
    date: NaiveDate,
    times: &[String],
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<u64, OrderFlowError> {
    let mut n = 0;
    for time in times {
        sqlx::query(
            r#"
            INSERT INTO time_slot_overrides (slot_date, slot_time, disabled, capacity, reason)
            VALUES (?, ?, 1, NULL, ?)
            ON CONFLICT (slot_date, slot_time) DO UPDATE
            SET disabled = 1, reason = COALESCE(excluded.reason, reason)
            "#,
        )
        .bind(date)
        .bind(time)
        .bind(reason)
        .execute(&mut *conn)
        .await?;
        n += 1;
    }
    Ok(n)
}

/// Clear every disabling override for a date. Pure-disable rows are deleted outright; rows that
/// also carry a capacity override keep the capacity and lose the disabled flag. Returns the
/// number of overrides touched; clearing a date with none is a no-op.
pub async fn bulk_enable(date: NaiveDate, conn: &mut SqliteConnection) -> Result<u64, OrderFlowError> {
    let deleted = sqlx::query("DELETE FROM time_slot_overrides WHERE slot_date = ? AND disabled = 1 AND capacity IS NULL")
        .bind(date)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    let updated = sqlx::query("UPDATE time_slot_overrides SET disabled = 0, reason = NULL WHERE slot_date = ? AND disabled = 1")
        .bind(date)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(deleted + updated)
}
