//! Notification endpoints

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use t2c_common::db::Notification;
use uuid::Uuid;

use super::{require_user, AppState};
use crate::{db, Error, Result};

/// GET /api/v1/notifications — unread only, newest first
pub async fn list_unread(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notification>>> {
    let user_id = require_user(&headers)?;
    let notifications = db::notifications::list_unread(&state.pool, user_id).await?;
    Ok(Json(notifications))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user_id = require_user(&headers)?;
    let marked = db::notifications::mark_read(&state.pool, id, user_id).await?;
    if marked == 0 {
        return Err(Error::NotFound(format!("notification {id}")));
    }
    Ok(Json(json!({ "marked": marked })))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let user_id = require_user(&headers)?;
    let marked = db::notifications::mark_all_read(&state.pool, user_id).await?;
    Ok(Json(json!({ "marked": marked })))
}
