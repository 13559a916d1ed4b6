//! Voucher and voucher-instance queries

use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use t2c_common::db::{Voucher, VoucherInstance};
use t2c_common::TierLevel;
use uuid::Uuid;

use crate::{Error, Result};

const VOUCHER_COLUMNS: &str = "id, name, description, tier, points, discount_amt, centre_id, \
                               claimed_count, claimable_count, expiration_date, is_active";

pub async fn insert(pool: &SqlitePool, voucher: &Voucher) -> Result<()> {
    sqlx::query(
        "INSERT INTO vouchers \
         (id, name, description, tier, points, discount_amt, centre_id, claimed_count, \
          claimable_count, expiration_date, is_active) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(voucher.id.to_string())
    .bind(&voucher.name)
    .bind(&voucher.description)
    .bind(voucher.tier.as_str())
    .bind(voucher.points)
    .bind(voucher.discount_amt)
    .bind(voucher.centre_id.to_string())
    .bind(voucher.claimed_count)
    .bind(voucher.claimable_count)
    .bind(voucher.expiration_date)
    .bind(voucher.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Voucher> {
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("voucher {id}")))?;
    voucher_from_row(&row)
}

/// Active, unexpired voucher definitions, cheapest first
pub async fn list_active(pool: &SqlitePool, today: NaiveDate) -> Result<Vec<Voucher>> {
    let sql = format!(
        "SELECT {VOUCHER_COLUMNS} FROM vouchers \
         WHERE is_active = 1 AND expiration_date >= ? ORDER BY points"
    );
    let rows = sqlx::query(&sql).bind(today).fetch_all(pool).await?;
    rows.iter().map(voucher_from_row).collect()
}

/// Atomic claim-count bump: succeeds only while copies remain and the
/// voucher is still active. Returns false when the supply ran out.
pub async fn try_increment_claimed(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE vouchers SET claimed_count = claimed_count + 1 \
         WHERE id = ? AND is_active = 1 AND claimed_count < claimable_count",
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn insert_instance(pool: &SqlitePool, instance: &VoucherInstance) -> Result<()> {
    sqlx::query(
        "INSERT INTO voucher_instances (id, voucher_id, user_id, claimed_on, redeemed, reminder_sent) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(instance.id.to_string())
    .bind(instance.voucher_id.to_string())
    .bind(instance.user_id.to_string())
    .bind(instance.claimed_on)
    .bind(instance.redeemed)
    .bind(instance.reminder_sent)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_instance(pool: &SqlitePool, id: Uuid) -> Result<VoucherInstance> {
    let row = sqlx::query(
        "SELECT id, voucher_id, user_id, claimed_on, redeemed, reminder_sent \
         FROM voucher_instances WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("voucher instance {id}")))?;
    instance_from_row(&row)
}

pub async fn list_instances_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
) -> Result<Vec<VoucherInstance>> {
    let rows = sqlx::query(
        "SELECT id, voucher_id, user_id, claimed_on, redeemed, reminder_sent \
         FROM voucher_instances WHERE user_id = ? ORDER BY claimed_on DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(instance_from_row).collect()
}

pub async fn instance_exists(pool: &SqlitePool, voucher_id: Uuid, user_id: Uuid) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM voucher_instances WHERE voucher_id = ? AND user_id = ?")
        .bind(voucher_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Flip an instance to redeemed exactly once. Returns false when it was
/// already redeemed or is not owned by `user_id`.
pub async fn try_mark_redeemed(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE voucher_instances SET redeemed = 1 \
         WHERE id = ? AND user_id = ? AND redeemed = 0",
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_instance(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM voucher_instances WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Unredeemed, unreminded instances of vouchers expiring exactly on
/// `target_date`, joined with the owner's email and the voucher name so the
/// sweep can compose reminders without extra lookups
pub async fn expiring_unreminded(
    pool: &SqlitePool,
    target_date: NaiveDate,
) -> Result<Vec<ExpiringInstance>> {
    let rows = sqlx::query(
        "SELECT vi.id AS instance_id, vi.user_id, u.email, u.first_name, \
                v.name AS voucher_name, v.expiration_date \
         FROM voucher_instances vi \
         JOIN vouchers v ON v.id = vi.voucher_id \
         JOIN users u ON u.id = vi.user_id \
         WHERE vi.redeemed = 0 AND vi.reminder_sent = 0 AND v.expiration_date = ?",
    )
    .bind(target_date)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let instance_id: String = row.get("instance_id");
            let user_id: String = row.get("user_id");
            Ok(ExpiringInstance {
                instance_id: super::parse_uuid(&instance_id)?,
                user_id: super::parse_uuid(&user_id)?,
                email: row.get("email"),
                first_name: row.get("first_name"),
                voucher_name: row.get("voucher_name"),
                expiration_date: row.get::<NaiveDate, _>("expiration_date"),
            })
        })
        .collect()
}

/// Conditional reminder-sent flip: the sweep only counts an instance as
/// reminded if this write actually landed, so a crashed run cannot lose
/// reminders and a concurrent run cannot double-send.
pub async fn try_mark_reminder_sent(pool: &SqlitePool, instance_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE voucher_instances SET reminder_sent = 1 WHERE id = ? AND reminder_sent = 0",
    )
    .bind(instance_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// One row of the expiry-reminder sweep working set
#[derive(Debug, Clone)]
pub struct ExpiringInstance {
    pub instance_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub voucher_name: String,
    pub expiration_date: NaiveDate,
}

fn voucher_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Voucher> {
    let id: String = row.get("id");
    let tier: String = row.get("tier");
    Ok(Voucher {
        id: super::parse_uuid(&id)?,
        name: row.get("name"),
        description: row.get("description"),
        tier: TierLevel::parse(&tier)
            .ok_or_else(|| Error::Internal(format!("unknown tier in database: {tier}")))?,
        points: row.get("points"),
        discount_amt: row.get("discount_amt"),
        centre_id: super::parse_uuid(&row.get::<String, _>("centre_id"))?,
        claimed_count: row.get("claimed_count"),
        claimable_count: row.get("claimable_count"),
        expiration_date: row.get::<NaiveDate, _>("expiration_date"),
        is_active: row.get("is_active"),
    })
}

fn instance_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<VoucherInstance> {
    let id: String = row.get("id");
    Ok(VoucherInstance {
        id: super::parse_uuid(&id)?,
        voucher_id: super::parse_uuid(&row.get::<String, _>("voucher_id"))?,
        user_id: super::parse_uuid(&row.get::<String, _>("user_id"))?,
        claimed_on: row.get::<NaiveDate, _>("claimed_on"),
        redeemed: row.get("redeemed"),
        reminder_sent: row.get("reminder_sent"),
    })
}
