//! Profile queries
//!
//! Points mutations are single atomic updates; the tier column is only
//! written by the profile service after recomputation.

use sqlx::{Row, SqlitePool};
use t2c_common::db::Profile;
use t2c_common::TierLevel;
use uuid::Uuid;

use crate::{Error, Result};

pub async fn insert(pool: &SqlitePool, profile: &Profile) -> Result<()> {
    sqlx::query(
        "INSERT INTO profiles \
         (user_id, street, city, postcode, points, tier, is_verified, is_seller, request_seller) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(profile.user_id.to_string())
    .bind(&profile.street)
    .bind(&profile.city)
    .bind(&profile.postcode)
    .bind(profile.points)
    .bind(profile.tier.as_str())
    .bind(profile.is_verified)
    .bind(profile.is_seller)
    .bind(profile.request_seller)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, user_id: Uuid) -> Result<Profile> {
    let row = sqlx::query(
        "SELECT user_id, street, city, postcode, points, tier, is_verified, is_seller, \
         request_seller FROM profiles WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("profile for user {user_id}")))?;
    from_row(&row)
}

/// Atomic points increment; negative deltas floor at zero so the
/// non-negative invariant holds even under concurrent redemptions.
pub async fn add_points(pool: &SqlitePool, user_id: Uuid, delta: i64) -> Result<()> {
    let result = sqlx::query("UPDATE profiles SET points = MAX(points + ?, 0) WHERE user_id = ?")
        .bind(delta)
        .bind(user_id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("profile for user {user_id}")));
    }
    Ok(())
}

pub async fn set_tier(pool: &SqlitePool, user_id: Uuid, tier: TierLevel) -> Result<()> {
    sqlx::query("UPDATE profiles SET tier = ? WHERE user_id = ?")
        .bind(tier.as_str())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_verified(pool: &SqlitePool, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE profiles SET is_verified = 1 WHERE user_id = ?")
        .bind(user_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Profile> {
    let user_id: String = row.get("user_id");
    let tier: String = row.get("tier");
    Ok(Profile {
        user_id: super::parse_uuid(&user_id)?,
        street: row.get("street"),
        city: row.get("city"),
        postcode: row.get("postcode"),
        points: row.get("points"),
        tier: TierLevel::parse(&tier)
            .ok_or_else(|| Error::Internal(format!("unknown tier in database: {tier}")))?,
        is_verified: row.get("is_verified"),
        is_seller: row.get("is_seller"),
        request_seller: row.get("request_seller"),
    })
}
