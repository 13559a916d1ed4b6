//! Voucher service: claim, redeem, use, expiry reminders
//!
//! A voucher definition is claimed into a per-user instance, redeemed by
//! spending points, then used (consumed) at the centre. Redemption is the
//! only points-spending path in the system.

use chrono::Utc;
use sqlx::SqlitePool;
use t2c_common::config::RewardsConfig;
use t2c_common::db::VoucherInstance;
use t2c_common::events::EventBus;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::email::{self, EmailDispatcher};
use crate::{Error, Result};

/// Claim a voucher definition into a per-user instance.
///
/// Gated on the user's tier and on remaining supply; the supply check is a
/// conditional counter bump so concurrent claims cannot overshoot
/// `claimable_count`.
pub async fn claim(
    pool: &SqlitePool,
    voucher_id: Uuid,
    user_id: Uuid,
) -> Result<VoucherInstance> {
    let voucher = db::vouchers::get(pool, voucher_id).await?;
    let profile = db::profiles::get(pool, user_id).await?;

    if !voucher.is_active || voucher.expiration_date < Utc::now().date_naive() {
        return Err(Error::Conflict(
            "This voucher is no longer available.".to_string(),
        ));
    }
    if profile.tier < voucher.tier {
        return Err(Error::Forbidden(format!(
            "This voucher requires the {} tier.",
            voucher.tier
        )));
    }
    if db::vouchers::instance_exists(pool, voucher_id, user_id).await? {
        return Err(Error::Conflict(
            "You have already claimed this voucher.".to_string(),
        ));
    }
    if !db::vouchers::try_increment_claimed(pool, voucher_id).await? {
        return Err(Error::Conflict(
            "All copies of this voucher have been claimed.".to_string(),
        ));
    }

    let instance = VoucherInstance {
        id: Uuid::new_v4(),
        voucher_id,
        user_id,
        claimed_on: Utc::now().date_naive(),
        redeemed: false,
        reminder_sent: false,
    };
    db::vouchers::insert_instance(pool, &instance).await?;
    info!("user {} claimed voucher {}", user_id, voucher_id);
    Ok(instance)
}

/// Redeem a claimed instance by spending the voucher's point cost.
///
/// An insufficient balance is a state conflict; a sufficient one deducts
/// the points, which may demote the tier.
pub async fn redeem(
    pool: &SqlitePool,
    bus: &EventBus,
    config: &RewardsConfig,
    instance_id: Uuid,
    user_id: Uuid,
) -> Result<VoucherInstance> {
    let instance = db::vouchers::get_instance(pool, instance_id).await?;
    if instance.user_id != user_id {
        return Err(Error::Forbidden(
            "You are not the owner of this voucher.".to_string(),
        ));
    }
    if instance.redeemed {
        return Err(Error::Conflict(
            "This voucher has already been redeemed.".to_string(),
        ));
    }

    let voucher = db::vouchers::get(pool, instance.voucher_id).await?;
    let profile = db::profiles::get(pool, user_id).await?;
    if profile.points < voucher.points {
        return Err(Error::Conflict(
            "You do not have enough points to redeem this!".to_string(),
        ));
    }

    if !db::vouchers::try_mark_redeemed(pool, instance_id, user_id).await? {
        return Err(Error::Conflict(
            "This voucher has already been redeemed.".to_string(),
        ));
    }
    super::profiles::award_points(pool, bus, config, user_id, -voucher.points).await?;

    info!(
        "user {} redeemed voucher instance {} for {} points",
        user_id, instance_id, voucher.points
    );
    db::vouchers::get_instance(pool, instance_id).await
}

/// Consume a redeemed instance at the centre. Unredeemed or foreign
/// instances read as not found, matching how the centre's scanner treats
/// them.
pub async fn use_voucher(pool: &SqlitePool, instance_id: Uuid, user_id: Uuid) -> Result<()> {
    let instance = db::vouchers::get_instance(pool, instance_id).await?;
    if instance.user_id != user_id || !instance.redeemed {
        return Err(Error::NotFound(format!(
            "redeemed voucher instance {instance_id}"
        )));
    }
    db::vouchers::delete_instance(pool, instance_id).await?;
    info!("voucher instance {} used by {}", instance_id, user_id);
    Ok(())
}

/// Daily sweep: remind holders of unredeemed instances whose voucher
/// expires in exactly `voucher_reminder_days` days.
///
/// The `reminder_sent` flip is conditional, so re-running the sweep (or two
/// overlapping runs) produces at most one reminder per instance. Returns
/// the number of reminders sent.
pub async fn send_expiry_reminders(
    pool: &SqlitePool,
    bus: &EventBus,
    dispatcher: &EmailDispatcher,
    config: &RewardsConfig,
) -> Result<u64> {
    let target = Utc::now().date_naive() + chrono::Duration::days(config.voucher_reminder_days);
    let expiring = db::vouchers::expiring_unreminded(pool, target).await?;

    let mut sent = 0u64;
    for row in expiring {
        // Claim the instance before notifying; a lost race means another
        // run already handled it.
        if !db::vouchers::try_mark_reminder_sent(pool, row.instance_id).await? {
            continue;
        }

        db::notifications::create(
            pool,
            bus,
            row.user_id,
            format!(
                "Your voucher \"{}\" expires on {}. Redeem it before it's gone!",
                row.voucher_name,
                row.expiration_date.format("%-d %b %Y"),
            ),
        )
        .await?;

        let (subject, body) =
            email::voucher_expiry_email(&row.first_name, &row.voucher_name, row.expiration_date);
        dispatcher.send_logged(&row.email, &subject, &body).await;
        sent += 1;
    }

    if sent > 0 {
        info!("sent {} voucher expiry reminders", sent);
    }
    Ok(sent)
}
