//! Side-effect pipeline
//!
//! A single spawned subscriber drains the event bus and performs the
//! follow-on work for each state transition: confirmation and arrival
//! emails, the points award for the booked item, and scheduling the
//! appointment reminder. Failures here are logged and never surface to the
//! request that produced the event.

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use t2c_common::events::DomainEvent;
use t2c_common::rewards;

use crate::api::AppState;
use crate::email;
use crate::{db, domain, tasks};

/// Spawn the pipeline. Runs until the bus closes (service shutdown).
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let mut rx = state.bus.subscribe();
        info!("side-effect pipeline attached to event bus");
        loop {
            match rx.recv().await {
                Ok(event) => handle_event(&state, event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("side-effect pipeline lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("event bus closed, side-effect pipeline exiting");
                    break;
                }
            }
        }
    });
}

async fn handle_event(state: &AppState, event: DomainEvent) {
    match event {
        DomainEvent::AppointmentBooked {
            appointment_id,
            user_id,
            centre_id,
            starts_at,
            ..
        } => {
            on_booked(state, appointment_id, user_id, centre_id, starts_at).await;
        }
        DomainEvent::AppointmentCompleted {
            appointment_id,
            user_id: Some(user_id),
            is_dropoff: false,
            ..
        } => {
            on_pickup_completed(state, appointment_id, user_id).await;
        }
        _ => {}
    }
}

async fn on_booked(
    state: &AppState,
    appointment_id: Uuid,
    user_id: Uuid,
    centre_id: Uuid,
    starts_at: chrono::DateTime<chrono::Utc>,
) {
    // Confirmation email, best effort.
    match load_user_and_centre(state, user_id, centre_id).await {
        Ok((user, centre)) => {
            let (subject, body) = email::booking_confirmation_email(
                &user.first_name,
                &centre.name,
                starts_at.date_naive(),
                starts_at.time(),
            );
            state.email.send_logged(&user.email, &subject, &body).await;
        }
        Err(e) => error!("cannot compose booking confirmation: {}", e),
    }

    // Points for the item this booking was made for.
    if let Err(e) = domain::profiles::award_latest_item_points(
        &state.pool,
        &state.bus,
        &state.config.rewards,
        user_id,
        appointment_id,
    )
    .await
    {
        error!("points award for appointment {} failed: {}", appointment_id, e);
    }

    // Reminder, clamped so it never lands in the past.
    let lead = chrono::Duration::minutes(state.config.rewards.reminder_lead_minutes);
    let eta = rewards::reminder_eta(starts_at, chrono::Utc::now(), lead);
    debug!("reminder for appointment {} scheduled at {}", appointment_id, eta);

    let reminder_state = state.clone();
    tasks::schedule_at(eta, async move {
        send_reminder(&reminder_state, appointment_id, user_id, centre_id, starts_at).await;
    });
}

/// Fires at the reminder eta. The booking may have been cancelled in the
/// meantime, so the status is re-checked and a stale reminder becomes a
/// no-op.
async fn send_reminder(
    state: &AppState,
    appointment_id: Uuid,
    user_id: Uuid,
    centre_id: Uuid,
    starts_at: chrono::DateTime<chrono::Utc>,
) {
    match domain::appointments::is_still_booked(&state.pool, appointment_id).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("appointment {} no longer booked, dropping reminder", appointment_id);
            return;
        }
        Err(e) => {
            error!("reminder status check for {} failed: {}", appointment_id, e);
            return;
        }
    }

    match load_user_and_centre(state, user_id, centre_id).await {
        Ok((user, centre)) => {
            let (subject, body) = email::reminder_email(
                &user.first_name,
                &centre.name,
                starts_at.date_naive(),
                starts_at.time(),
            );
            state.email.send_logged(&user.email, &subject, &body).await;

            if let Err(e) = db::notifications::create(
                &state.pool,
                &state.bus,
                user_id,
                format!(
                    "Reminder: your appointment at {} is at {} today.",
                    centre.name,
                    starts_at.time().format("%H:%M"),
                ),
            )
            .await
            {
                error!("reminder notification for {} failed: {}", appointment_id, e);
            }
        }
        Err(e) => error!("cannot compose reminder: {}", e),
    }
}

async fn on_pickup_completed(state: &AppState, appointment_id: Uuid, user_id: Uuid) {
    let appointment = match db::appointments::get(&state.pool, appointment_id).await {
        Ok(appt) => appt,
        Err(e) => {
            error!("arrival email lookup for {} failed: {}", appointment_id, e);
            return;
        }
    };
    match load_user_and_centre(state, user_id, appointment.centre_id).await {
        Ok((user, centre)) => {
            let (subject, body) = email::arrival_confirmation_email(&user.first_name, &centre.name);
            state.email.send_logged(&user.email, &subject, &body).await;
        }
        Err(e) => error!("cannot compose arrival confirmation: {}", e),
    }
}

async fn load_user_and_centre(
    state: &AppState,
    user_id: Uuid,
    centre_id: Uuid,
) -> crate::Result<(t2c_common::db::User, t2c_common::db::RecyclingCentre)> {
    let user = db::users::get(&state.pool, user_id).await?;
    let centre = db::centres::get(&state.pool, centre_id).await?;
    Ok((user, centre))
}
