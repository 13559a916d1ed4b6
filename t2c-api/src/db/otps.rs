//! Registration one-time-code queries

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use t2c_common::db::Otp;

use crate::Result;

pub async fn insert(pool: &SqlitePool, otp: &Otp) -> Result<()> {
    sqlx::query("INSERT INTO otps (id, email, code, created_at) VALUES (?, ?, ?, ?)")
        .bind(otp.id.to_string())
        .bind(&otp.email)
        .bind(&otp.code)
        .bind(otp.created_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// The most recent code issued for an address; earlier codes are dead the
/// moment a new one is issued.
pub async fn latest_for_email(pool: &SqlitePool, email: &str) -> Result<Option<Otp>> {
    let row = sqlx::query(
        "SELECT id, email, code, created_at FROM otps \
         WHERE email = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn delete_for_email(pool: &SqlitePool, email: &str) -> Result<()> {
    sqlx::query("DELETE FROM otps WHERE email = ?")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

/// Sweep helper: drop codes created before `cutoff`; returns rows deleted
pub async fn purge_expired(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM otps WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Otp> {
    let id: String = row.get("id");
    Ok(Otp {
        id: super::parse_uuid(&id)?,
        email: row.get("email"),
        code: row.get("code"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}
