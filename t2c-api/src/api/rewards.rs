//! Rewards endpoints: vouchers and instances

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use t2c_common::db::{Voucher, VoucherInstance};
use t2c_common::rewards::TierLevel;
use uuid::Uuid;

use super::{require_user, AppState};
use crate::{db, domain, Result};

/// GET /api/v1/rewards/vouchers — active, unexpired definitions
pub async fn list_vouchers(State(state): State<AppState>) -> Result<Json<Vec<Voucher>>> {
    let vouchers = db::vouchers::list_active(&state.pool, Utc::now().date_naive()).await?;
    Ok(Json(vouchers))
}

#[derive(Debug, Deserialize)]
pub struct CreateVoucherBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tier: TierLevel,
    pub points: i64,
    #[serde(default)]
    pub discount_amt: f64,
    pub centre_id: Uuid,
    pub claimable_count: i64,
    pub expiration_date: NaiveDate,
}

/// POST /api/v1/rewards/vouchers
pub async fn create_voucher(
    State(state): State<AppState>,
    Json(body): Json<CreateVoucherBody>,
) -> Result<Json<Voucher>> {
    let voucher = Voucher {
        id: Uuid::new_v4(),
        name: body.name,
        description: body.description,
        tier: body.tier,
        points: body.points,
        discount_amt: body.discount_amt,
        centre_id: body.centre_id,
        claimed_count: 0,
        claimable_count: body.claimable_count,
        expiration_date: body.expiration_date,
        is_active: true,
    };
    db::vouchers::insert(&state.pool, &voucher).await?;
    Ok(Json(voucher))
}

#[derive(Debug, Serialize)]
pub struct InstancesResponse {
    pub tier: TierLevel,
    pub points: i64,
    pub next_tier: Option<TierLevel>,
    /// Points still needed to reach the next tier
    pub points_to_next_tier: Option<i64>,
    pub instances: Vec<VoucherInstance>,
}

/// GET /api/v1/rewards/instances — the user's claims, with their rewards
/// standing alongside so the client can render the tier card in one call
pub async fn list_instances(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<InstancesResponse>> {
    let user_id = require_user(&headers)?;
    let profile = db::profiles::get(&state.pool, user_id).await?;
    let instances = db::vouchers::list_instances_for_user(&state.pool, user_id).await?;

    let next_tier = profile.tier.next();
    let points_to_next_tier = next_tier.and_then(|next| {
        state
            .config
            .rewards
            .tier_thresholds
            .iter()
            .find(|t| t.tier == next)
            .map(|t| (t.min_points - profile.points).max(0))
    });

    Ok(Json(InstancesResponse {
        tier: profile.tier,
        points: profile.points,
        next_tier,
        points_to_next_tier,
        instances,
    }))
}

/// POST /api/v1/rewards/vouchers/:id/claim
pub async fn claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<VoucherInstance>> {
    let user_id = require_user(&headers)?;
    let instance = domain::vouchers::claim(&state.pool, id, user_id).await?;
    Ok(Json(instance))
}

/// POST /api/v1/rewards/instances/:id/redeem
pub async fn redeem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<VoucherInstance>> {
    let user_id = require_user(&headers)?;
    let instance =
        domain::vouchers::redeem(&state.pool, &state.bus, &state.config.rewards, id, user_id)
            .await?;
    Ok(Json(instance))
}

/// POST /api/v1/rewards/instances/:id/use
pub async fn use_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user_id = require_user(&headers)?;
    domain::vouchers::use_voucher(&state.pool, id, user_id).await?;
    Ok(Json(json!({ "used": true })))
}
