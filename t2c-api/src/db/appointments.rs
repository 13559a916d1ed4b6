//! Appointment queries
//!
//! Status transitions are expressed as conditional updates so the state
//! precondition and the write are a single atomic statement. The booking
//! race (two users confirming the same Available slot) is decided here: at
//! most one `try_book` can match the WHERE clause.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{Row, SqlitePool};
use t2c_common::db::{Appointment, AppointmentStatus};
use uuid::Uuid;

use crate::{Error, Result};

const COLUMNS: &str = "id, user_id, centre_id, category, item_weight_kg, points_earned, \
                       date, time, is_dropoff, driver_id, arrival_time, status, \
                       created_at, updated_at";

pub async fn insert(pool: &SqlitePool, appt: &Appointment) -> Result<()> {
    sqlx::query(
        "INSERT INTO appointments \
         (id, user_id, centre_id, category, item_weight_kg, points_earned, date, time, \
          is_dropoff, driver_id, arrival_time, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(appt.id.to_string())
    .bind(appt.user_id.map(|u| u.to_string()))
    .bind(appt.centre_id.to_string())
    .bind(&appt.category)
    .bind(appt.item_weight_kg)
    .bind(appt.points_earned)
    .bind(appt.date)
    .bind(appt.time)
    .bind(appt.is_dropoff)
    .bind(appt.driver_id.map(|u| u.to_string()))
    .bind(appt.arrival_time)
    .bind(appt.status.as_str())
    .bind(appt.created_at)
    .bind(appt.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Appointment> {
    let sql = format!("SELECT {COLUMNS} FROM appointments WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("appointment {id}")))?;
    from_row(&row)
}

/// Atomic booking claim: succeeds only while the slot is Available and
/// unassigned. Returns false when another requester already won.
pub async fn try_book(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE appointments SET user_id = ?, status = 'Booked', updated_at = ? \
         WHERE id = ? AND user_id IS NULL AND status = 'Available'",
    )
    .bind(user_id.to_string())
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Revert a Booked appointment held by `user_id` back to Available,
/// clearing the assignment. Returns false when the row no longer matches.
pub async fn try_release(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE appointments SET user_id = NULL, status = 'Available', updated_at = ? \
         WHERE id = ? AND user_id = ? AND status = 'Booked'",
    )
    .bind(Utc::now())
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Record a pickup arrival exactly once: the null check makes a second
/// arrival write a no-op the caller reports as a conflict.
pub async fn try_record_arrival(pool: &SqlitePool, id: Uuid, time: NaiveTime) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE appointments SET arrival_time = ?, status = 'Completed', updated_at = ? \
         WHERE id = ? AND arrival_time IS NULL",
    )
    .bind(time)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_points_earned(pool: &SqlitePool, id: Uuid, points: i64) -> Result<()> {
    sqlx::query("UPDATE appointments SET points_earned = ? WHERE id = ?")
        .bind(points)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Unassigned Available slots for a centre on a date, optionally filtered
/// by drop-off vs pickup
pub async fn list_available(
    pool: &SqlitePool,
    centre_id: Uuid,
    date: NaiveDate,
    is_dropoff: Option<bool>,
) -> Result<Vec<Appointment>> {
    let mut sql = format!(
        "SELECT {COLUMNS} FROM appointments \
         WHERE centre_id = ? AND date = ? AND user_id IS NULL AND status = 'Available'"
    );
    if is_dropoff.is_some() {
        sql.push_str(" AND is_dropoff = ?");
    }
    sql.push_str(" ORDER BY time");

    let mut query = sqlx::query(&sql).bind(centre_id.to_string()).bind(date);
    if let Some(dropoff) = is_dropoff {
        query = query.bind(dropoff);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(from_row).collect()
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    status: Option<AppointmentStatus>,
) -> Result<Vec<Appointment>> {
    let mut sql = format!("SELECT {COLUMNS} FROM appointments WHERE user_id = ?");
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY date, time");

    let mut query = sqlx::query(&sql).bind(user_id.to_string());
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(from_row).collect()
}

/// Booked and Completed appointments at a centre, for centre-admin views
pub async fn list_active_for_centre(
    pool: &SqlitePool,
    centre_id: Uuid,
) -> Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM appointments \
         WHERE centre_id = ? AND status IN ('Booked', 'Completed') ORDER BY date, time"
    );
    let rows = sqlx::query(&sql)
        .bind(centre_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Purge Temporary slots not touched since `cutoff`; returns rows deleted
pub async fn delete_stale_temporary(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result =
        sqlx::query("DELETE FROM appointments WHERE status = 'Temporary' AND updated_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Appointment> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    Ok(Appointment {
        id: super::parse_uuid(&id)?,
        user_id: super::parse_uuid_opt(row.get("user_id"))?,
        centre_id: super::parse_uuid(&row.get::<String, _>("centre_id"))?,
        category: row.get("category"),
        item_weight_kg: row.get("item_weight_kg"),
        points_earned: row.get("points_earned"),
        date: row.get::<NaiveDate, _>("date"),
        time: row.get::<NaiveTime, _>("time"),
        is_dropoff: row.get("is_dropoff"),
        driver_id: super::parse_uuid_opt(row.get("driver_id"))?,
        arrival_time: row.get::<Option<NaiveTime>, _>("arrival_time"),
        status: AppointmentStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown status in database: {status}")))?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}
