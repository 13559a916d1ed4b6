//! Profile and registration endpoints

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use t2c_common::config::TierThreshold;
use t2c_common::db::Profile;

use super::{require_user, AppState};
use crate::{db, domain, Result};

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    #[serde(flatten)]
    pub profile: Profile,
    /// The configured threshold table, for client-side tier progress bars
    pub tier_thresholds: Vec<TierThreshold>,
}

/// GET /api/v1/profile
pub async fn profile_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileSummary>> {
    let user_id = require_user(&headers)?;
    let profile = db::profiles::get(&state.pool, user_id).await?;
    Ok(Json(ProfileSummary {
        profile,
        tier_thresholds: state.config.rewards.tier_thresholds.clone(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendOtpBody {
    pub email: String,
}

/// POST /api/v1/otp/send
pub async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpBody>,
) -> Result<Json<Value>> {
    domain::profiles::send_otp(&state.pool, &state.email, &body.email).await?;
    Ok(Json(json!({ "sent": true })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub email: String,
    pub code: String,
}

/// POST /api/v1/otp/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> Result<Json<Value>> {
    domain::profiles::verify_otp(&state.pool, &state.config.rewards, &body.email, &body.code)
        .await?;
    Ok(Json(json!({ "verified": true })))
}
