//! Notification queries
//!
//! The table is append-only; the only mutation ever issued is flipping
//! `is_read`. Deletion happens solely via the user foreign-key cascade.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use t2c_common::db::Notification;
use t2c_common::events::{DomainEvent, EventBus};
use uuid::Uuid;

use crate::Result;

/// Append a notification and announce it on the bus (SSE push)
pub async fn create(
    pool: &SqlitePool,
    bus: &EventBus,
    user_id: Uuid,
    message: String,
) -> Result<Notification> {
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id,
        message,
        is_read: false,
        created_at: Utc::now(),
    };
    sqlx::query(
        "INSERT INTO notifications (id, user_id, message, is_read, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(notification.id.to_string())
    .bind(notification.user_id.to_string())
    .bind(&notification.message)
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(pool)
    .await?;

    bus.emit_lossy(DomainEvent::NotificationCreated {
        notification_id: notification.id,
        user_id,
        timestamp: notification.created_at,
    });
    Ok(notification)
}

/// Unread notifications for a user, newest first
pub async fn list_unread(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Notification>> {
    let rows = sqlx::query(
        "SELECT id, user_id, message, is_read, created_at FROM notifications \
         WHERE user_id = ? AND is_read = 0 ORDER BY created_at DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Mark one notification read; returns rows marked (0 when not owned or
/// missing)
pub async fn mark_read(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Mark all of a user's unread notifications read; returns the count marked
pub async fn mark_all_read(pool: &SqlitePool, user_id: Uuid) -> Result<u64> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id.to_string())
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    Ok(Notification {
        id: super::parse_uuid(&id)?,
        user_id: super::parse_uuid(&user_id)?,
        message: row.get("message"),
        is_read: row.get("is_read"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}
