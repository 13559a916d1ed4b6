//! Appointment endpoints

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use t2c_common::db::{Appointment, AppointmentStatus};
use uuid::Uuid;

use super::{require_user, AppState};
use crate::{db, domain, Error, Result};

#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub centre_id: Uuid,
    pub date: NaiveDate,
    pub is_dropoff: Option<bool>,
}

/// GET /api/v1/appointments/available
pub async fn list_available(
    State(state): State<AppState>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Vec<Appointment>>> {
    let slots =
        db::appointments::list_available(&state.pool, query.centre_id, query.date, query.is_dropoff)
            .await?;
    Ok(Json(slots))
}

#[derive(Debug, Deserialize)]
pub struct MineQuery {
    pub status: Option<String>,
}

/// GET /api/v1/appointments/mine
pub async fn list_mine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MineQuery>,
) -> Result<Json<Vec<Appointment>>> {
    let user_id = require_user(&headers)?;
    let status = query
        .status
        .as_deref()
        .map(|s| {
            AppointmentStatus::parse(s)
                .ok_or_else(|| Error::InvalidInput(format!("unknown status: {s}")))
        })
        .transpose()?;
    let appointments = db::appointments::list_for_user(&state.pool, user_id, status).await?;
    Ok(Json(appointments))
}

/// POST /api/v1/appointments/:id/book
pub async fn book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>> {
    let user_id = require_user(&headers)?;
    let appointment = domain::appointments::book(&state.pool, &state.bus, id, user_id).await?;
    Ok(Json(appointment))
}

/// POST /api/v1/appointments/:id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>> {
    let user_id = require_user(&headers)?;
    let appointment = domain::appointments::cancel(&state.pool, &state.bus, id, user_id).await?;
    Ok(Json(appointment))
}

#[derive(Debug, Deserialize, Default)]
pub struct ArrivalBody {
    /// Defaults to the current time when omitted
    pub arrival_time: Option<NaiveTime>,
}

/// POST /api/v1/appointments/:id/arrival
pub async fn record_arrival(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ArrivalBody>>,
) -> Result<Json<Appointment>> {
    let time = body
        .and_then(|Json(b)| b.arrival_time)
        .unwrap_or_else(|| Utc::now().time());
    let appointment = domain::appointments::record_arrival(&state.pool, &state.bus, id, time).await?;
    Ok(Json(appointment))
}

/// GET /api/v1/centres/:id/appointments
pub async fn list_for_centre(
    State(state): State<AppState>,
    Path(centre_id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>> {
    let appointments = db::appointments::list_active_for_centre(&state.pool, centre_id).await?;
    Ok(Json(appointments))
}
