//! Recyclable item queries

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use t2c_common::db::Item;
use uuid::Uuid;

use crate::Result;

pub async fn insert(pool: &SqlitePool, item: &Item) -> Result<()> {
    let labels = item
        .labels
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| crate::Error::Internal(format!("cannot serialize labels: {e}")))?;

    sqlx::query(
        "INSERT INTO items \
         (id, user_id, appointment_id, category, confidence, description, weight_kg, labels, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(item.id.to_string())
    .bind(item.user_id.to_string())
    .bind(item.appointment_id.map(|u| u.to_string()))
    .bind(&item.category)
    .bind(item.confidence)
    .bind(&item.description)
    .bind(item.weight_kg)
    .bind(labels)
    .bind(item.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// The user's most recently created item; the points award after a booking
/// confirmation reads exactly this row.
pub async fn latest_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Item>> {
    let row = sqlx::query(
        "SELECT id, user_id, appointment_id, category, confidence, description, weight_kg, \
         labels, created_at FROM items WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Item> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let labels: Option<String> = row.get("labels");
    let labels = labels
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| crate::Error::Internal(format!("cannot parse labels: {e}")))?;
    Ok(Item {
        id: super::parse_uuid(&id)?,
        user_id: super::parse_uuid(&user_id)?,
        appointment_id: super::parse_uuid_opt(row.get("appointment_id"))?,
        category: row.get("category"),
        confidence: row.get("confidence"),
        description: row.get("description"),
        weight_kg: row.get("weight_kg"),
        labels,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}
