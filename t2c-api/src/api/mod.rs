//! HTTP API layer

mod appointments;
mod centres;
mod notifications;
mod rewards;
mod sse;
mod users;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use t2c_common::config::AppConfig;
use t2c_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::email::EmailDispatcher;
use crate::{Error, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub bus: EventBus,
    pub config: Arc<AppConfig>,
    pub email: EmailDispatcher,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Appointments
        .route("/appointments/available", get(appointments::list_available))
        .route("/appointments/mine", get(appointments::list_mine))
        .route("/appointments/:id/book", post(appointments::book))
        .route("/appointments/:id/cancel", post(appointments::cancel))
        .route("/appointments/:id/arrival", post(appointments::record_arrival))
        // Notifications
        .route("/notifications", get(notifications::list_unread))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        // Rewards
        .route("/rewards/vouchers", get(rewards::list_vouchers).post(rewards::create_voucher))
        .route("/rewards/instances", get(rewards::list_instances))
        .route("/rewards/vouchers/:id/claim", post(rewards::claim))
        .route("/rewards/instances/:id/redeem", post(rewards::redeem))
        .route("/rewards/instances/:id/use", post(rewards::use_voucher))
        // Profile and registration
        .route("/profile", get(users::profile_summary))
        .route("/otp/send", post(users::send_otp))
        .route("/otp/verify", post(users::verify_otp))
        // Centres
        .route("/centres", get(centres::list))
        .route("/categories", get(centres::list_categories))
        .route("/centres/:id/appointments", get(appointments::list_for_centre))
        // Server-sent events
        .route("/events", get(sse::event_stream));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "subscribers": state.bus.subscriber_count(),
        })),
    )
}

/// Identify the requesting user from the `X-User-Id` header.
///
/// Authentication proper sits in front of this service; by the time a
/// request lands here the gateway has stamped the verified user id.
pub(crate) fn require_user(headers: &HeaderMap) -> Result<Uuid> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::InvalidInput("missing X-User-Id header".to_string()))?;
    Uuid::parse_str(raw).map_err(|_| Error::InvalidInput("malformed X-User-Id header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn require_user_parses_the_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(require_user(&headers).unwrap(), id);
    }

    #[test]
    fn require_user_rejects_missing_or_garbage() {
        assert!(require_user(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        assert!(require_user(&headers).is_err());
    }
}
