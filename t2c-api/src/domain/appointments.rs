//! Appointment state machine
//!
//! Transitions are explicit operations; there is no diff-inference over
//! submitted rows. Preconditions are folded into the conditional updates in
//! the query layer wherever a race is possible.

use chrono::{NaiveTime, Utc};
use sqlx::SqlitePool;
use t2c_common::config::RewardsConfig;
use t2c_common::db::{Appointment, AppointmentStatus};
use t2c_common::events::{DomainEvent, EventBus};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db;
use crate::{Error, Result};

/// Confirm an Available appointment for `user_id`.
///
/// The claim is a single conditional update, so two users confirming the
/// same slot race safely: exactly one wins, the other gets a state-conflict
/// error. The winner gets a notification and an `AppointmentBooked` event.
pub async fn book(
    pool: &SqlitePool,
    bus: &EventBus,
    appointment_id: Uuid,
    user_id: Uuid,
) -> Result<Appointment> {
    // Existence check first so a missing id is 404, not a conflict.
    let existing = db::appointments::get(pool, appointment_id).await?;

    if !db::appointments::try_book(pool, appointment_id, user_id).await? {
        debug!(
            "booking of {} by {} lost to state {} (user {:?})",
            appointment_id, user_id, existing.status, existing.user_id
        );
        return Err(Error::Conflict(
            "This appointment is not available.".to_string(),
        ));
    }

    let appointment = db::appointments::get(pool, appointment_id).await?;
    info!("appointment {} booked by user {}", appointment_id, user_id);

    db::notifications::create(
        pool,
        bus,
        user_id,
        format!(
            "Appointment {} booked for {} at {}.",
            appointment.id,
            appointment.date.format("%-d %b %Y"),
            appointment.time.format("%H:%M"),
        ),
    )
    .await?;

    bus.emit_lossy(DomainEvent::AppointmentBooked {
        appointment_id,
        user_id,
        centre_id: appointment.centre_id,
        starts_at: appointment.starts_at(),
        timestamp: Utc::now(),
    });

    Ok(appointment)
}

/// Cancel a Booked appointment, reverting the slot to Available.
///
/// Only the assigned user may cancel; anyone else gets an authorization
/// error even when the appointment exists.
pub async fn cancel(
    pool: &SqlitePool,
    bus: &EventBus,
    appointment_id: Uuid,
    user_id: Uuid,
) -> Result<Appointment> {
    let existing = db::appointments::get(pool, appointment_id).await?;

    match existing.user_id {
        Some(assigned) if assigned == user_id => {}
        Some(_) => {
            return Err(Error::Forbidden(
                "You are not the owner of this appointment.".to_string(),
            ))
        }
        None => {
            return Err(Error::Conflict(
                "This appointment is not booked.".to_string(),
            ))
        }
    }

    if !db::appointments::try_release(pool, appointment_id, user_id).await? {
        return Err(Error::Conflict(format!(
            "Cannot cancel an appointment in status {}.",
            existing.status
        )));
    }

    info!("appointment {} cancelled by user {}", appointment_id, user_id);

    db::notifications::create(
        pool,
        bus,
        user_id,
        format!(
            "Your appointment on {} at {} has been cancelled.",
            existing.date.format("%-d %b %Y"),
            existing.time.format("%H:%M"),
        ),
    )
    .await?;

    bus.emit_lossy(DomainEvent::AppointmentCancelled {
        appointment_id,
        user_id,
        timestamp: Utc::now(),
    });

    db::appointments::get(pool, appointment_id).await
}

/// Record the driver's arrival at the centre for a pickup appointment.
///
/// Drop-offs never carry an arrival time; attempting one is a domain error.
/// The conditional update makes the Completed transition happen exactly
/// once; a second arrival report is a state conflict.
pub async fn record_arrival(
    pool: &SqlitePool,
    bus: &EventBus,
    appointment_id: Uuid,
    time: NaiveTime,
) -> Result<Appointment> {
    let existing = db::appointments::get(pool, appointment_id).await?;

    if existing.is_dropoff {
        return Err(Error::Domain(
            "arrival time on a drop-off appointment".to_string(),
        ));
    }

    if !db::appointments::try_record_arrival(pool, appointment_id, time).await? {
        return Err(Error::Conflict(
            "Arrival has already been recorded for this appointment.".to_string(),
        ));
    }

    let appointment = db::appointments::get(pool, appointment_id).await?;
    info!("appointment {} arrival recorded at {}", appointment_id, time);

    if let Some(user_id) = appointment.user_id {
        db::notifications::create(
            pool,
            bus,
            user_id,
            "Your items have arrived at the recycling centre.".to_string(),
        )
        .await?;
    }

    bus.emit_lossy(DomainEvent::AppointmentCompleted {
        appointment_id,
        user_id: appointment.user_id,
        is_dropoff: appointment.is_dropoff,
        timestamp: Utc::now(),
    });

    Ok(appointment)
}

/// Purge Temporary slots that have sat unclaimed past the configured expiry
/// window. Run by the periodic sweep; duplicate-tolerant by construction.
pub async fn cleanup_temporary(pool: &SqlitePool, config: &RewardsConfig) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::minutes(config.temporary_expiry_minutes);
    let removed = db::appointments::delete_stale_temporary(pool, cutoff).await?;
    if removed > 0 {
        info!("purged {} stale temporary appointments", removed);
    }
    Ok(removed)
}

/// True when the appointment is still Booked, i.e. a scheduled reminder for
/// it should actually fire.
pub async fn is_still_booked(pool: &SqlitePool, appointment_id: Uuid) -> Result<bool> {
    match db::appointments::get(pool, appointment_id).await {
        Ok(appt) => Ok(appt.status == AppointmentStatus::Booked),
        Err(Error::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
