//! Recycling centre queries

use chrono::NaiveTime;
use sqlx::{Row, SqlitePool};
use t2c_common::db::{Category, RecyclingCentre};
use uuid::Uuid;

use crate::{Error, Result};

pub async fn insert(pool: &SqlitePool, centre: &RecyclingCentre) -> Result<()> {
    sqlx::query(
        "INSERT INTO recycling_centres \
         (id, name, email, address, latitude, longitude, opening_time, closing_time) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(centre.id.to_string())
    .bind(&centre.name)
    .bind(&centre.email)
    .bind(&centre.address)
    .bind(centre.latitude)
    .bind(centre.longitude)
    .bind(centre.opening_time)
    .bind(centre.closing_time)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<RecyclingCentre> {
    let row = sqlx::query(
        "SELECT id, name, email, address, latitude, longitude, opening_time, closing_time \
         FROM recycling_centres WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("recycling centre {id}")))?;
    from_row(&row)
}

/// All centres, optionally restricted to those accepting a category (by
/// category name, via the junction table)
pub async fn list(pool: &SqlitePool, category: Option<&str>) -> Result<Vec<RecyclingCentre>> {
    let rows = if let Some(category) = category {
        sqlx::query(
            "SELECT rc.id, rc.name, rc.email, rc.address, rc.latitude, rc.longitude, \
                    rc.opening_time, rc.closing_time \
             FROM recycling_centres rc \
             JOIN centre_categories cc ON cc.centre_id = rc.id \
             JOIN categories c ON c.id = cc.category_id \
             WHERE c.name = ? ORDER BY rc.name",
        )
        .bind(category)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query(
            "SELECT id, name, email, address, latitude, longitude, opening_time, closing_time \
             FROM recycling_centres ORDER BY name",
        )
        .fetch_all(pool)
        .await?
    };
    rows.iter().map(from_row).collect()
}

pub async fn insert_category(pool: &SqlitePool, category: &Category) -> Result<()> {
    sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
        .bind(category.id.to_string())
        .bind(&category.name)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn link_category(pool: &SqlitePool, centre_id: Uuid, category_id: Uuid) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO centre_categories (centre_id, category_id) VALUES (?, ?)",
    )
    .bind(centre_id.to_string())
    .bind(category_id.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            Ok(Category {
                id: super::parse_uuid(&id)?,
                name: row.get("name"),
            })
        })
        .collect()
}

fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RecyclingCentre> {
    let id: String = row.get("id");
    Ok(RecyclingCentre {
        id: super::parse_uuid(&id)?,
        name: row.get("name"),
        email: row.get("email"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        opening_time: row.get::<NaiveTime, _>("opening_time"),
        closing_time: row.get::<NaiveTime, _>("closing_time"),
    })
}
