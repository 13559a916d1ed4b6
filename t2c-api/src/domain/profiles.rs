//! Profile service: points, tier recomputation, registration OTP
//!
//! Every points mutation funnels through [`award_points`] so the
//! tier-consistency invariant (stored tier always matches the threshold
//! table for the stored points) holds after every write.

use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use t2c_common::config::RewardsConfig;
use t2c_common::db::{Otp, Profile};
use t2c_common::events::{DomainEvent, EventBus};
use t2c_common::rewards;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db;
use crate::email::{self, EmailDispatcher};
use crate::{Error, Result};

/// Adjust a user's points by `delta` (negative for redemptions, floored at
/// zero) and recompute the tier.
pub async fn award_points(
    pool: &SqlitePool,
    bus: &EventBus,
    config: &RewardsConfig,
    user_id: Uuid,
    delta: i64,
) -> Result<Profile> {
    db::profiles::add_points(pool, user_id, delta).await?;
    recompute_tier(pool, bus, config, user_id).await
}

/// Bring the stored tier in line with the current point total.
///
/// Idempotent: when the mapped tier equals the stored tier nothing is
/// written and no notification appears. On a change, exactly one
/// notification is inserted (upgrade or demotion wording) and a
/// `TierChanged` event is emitted.
pub async fn recompute_tier(
    pool: &SqlitePool,
    bus: &EventBus,
    config: &RewardsConfig,
    user_id: Uuid,
) -> Result<Profile> {
    let profile = db::profiles::get(pool, user_id).await?;
    let mapped = rewards::tier_for_points(profile.points, config);

    if mapped == profile.tier {
        return Ok(profile);
    }

    db::profiles::set_tier(pool, user_id, mapped).await?;
    info!(
        "user {} tier {} -> {} at {} points",
        user_id, profile.tier, mapped, profile.points
    );

    let message = if mapped > profile.tier {
        format!(
            "Congratulations! You have been upgraded to the {} tier with {} points.",
            mapped, profile.points
        )
    } else {
        format!(
            "Your tier has changed to {} ({} points remaining).",
            mapped, profile.points
        )
    };
    db::notifications::create(pool, bus, user_id, message).await?;

    bus.emit_lossy(DomainEvent::TierChanged {
        user_id,
        old_tier: profile.tier,
        new_tier: mapped,
        points: profile.points,
        timestamp: Utc::now(),
    });

    db::profiles::get(pool, user_id).await
}

/// Award points for the user's most recently classified item, the one the
/// booking was made for. Records the award on the appointment row.
pub async fn award_latest_item_points(
    pool: &SqlitePool,
    bus: &EventBus,
    config: &RewardsConfig,
    user_id: Uuid,
    appointment_id: Uuid,
) -> Result<i64> {
    let Some(item) = db::items::latest_for_user(pool, user_id).await? else {
        debug!("user {} has no items; no points to award", user_id);
        return Ok(0);
    };

    let points = rewards::points_for_item(&item.category, item.weight_kg, config);
    db::appointments::set_points_earned(pool, appointment_id, points).await?;
    if points > 0 {
        award_points(pool, bus, config, user_id, points).await?;
        info!(
            "awarded {} points to user {} for {:.2} kg of {}",
            points, user_id, item.weight_kg, item.category
        );
    }
    Ok(points)
}

/// Issue a registration verification code and email it.
///
/// The address must belong to a known user. Only the most recent code for
/// an address is ever accepted, so re-sending invalidates earlier codes.
pub async fn send_otp(
    pool: &SqlitePool,
    dispatcher: &EmailDispatcher,
    address: &str,
) -> Result<()> {
    let user = db::users::get_by_email(pool, address)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no user with email {address}")))?;

    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
    let otp = Otp {
        id: Uuid::new_v4(),
        email: user.email.clone(),
        code: code.clone(),
        created_at: Utc::now(),
    };
    db::otps::insert(pool, &otp).await?;

    let (subject, body) = email::otp_email(&user.first_name, &code);
    dispatcher.send_logged(&user.email, &subject, &body).await;
    info!("otp issued for {}", user.email);
    Ok(())
}

/// Verify a registration code. Success marks the profile verified and
/// discards the user's outstanding codes.
pub async fn verify_otp(
    pool: &SqlitePool,
    config: &RewardsConfig,
    address: &str,
    code: &str,
) -> Result<()> {
    let user = db::users::get_by_email(pool, address)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no user with email {address}")))?;

    let otp = db::otps::latest_for_email(pool, address)
        .await?
        .ok_or_else(|| Error::InvalidInput("No verification code was issued.".to_string()))?;

    let age = Utc::now() - otp.created_at;
    if age > chrono::Duration::minutes(config.otp_expiry_minutes) {
        return Err(Error::InvalidInput(
            "The verification code has expired.".to_string(),
        ));
    }
    if otp.code != code {
        return Err(Error::InvalidInput(
            "The verification code is incorrect.".to_string(),
        ));
    }

    db::profiles::set_verified(pool, user.id).await?;
    db::otps::delete_for_email(pool, address).await?;
    info!("user {} verified via otp", user.id);
    Ok(())
}

/// Sweep helper: drop codes past the expiry window.
pub async fn purge_expired_otps(pool: &SqlitePool, config: &RewardsConfig) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::minutes(config.otp_expiry_minutes);
    let removed = db::otps::purge_expired(pool, cutoff).await?;
    if removed > 0 {
        debug!("purged {} expired otp codes", removed);
    }
    Ok(removed)
}
