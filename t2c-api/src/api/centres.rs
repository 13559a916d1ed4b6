//! Recycling centre endpoints

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use t2c_common::db::{Category, RecyclingCentre};

use super::AppState;
use crate::{db, Result};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Deserialize)]
pub struct CentresQuery {
    /// Only centres accepting this category (by name)
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CentreWithDistance {
    #[serde(flatten)]
    pub centre: RecyclingCentre,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// GET /api/v1/centres
///
/// With a latitude/longitude pair the list is sorted nearest-first and each
/// entry carries the great-circle distance; otherwise it is alphabetical.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CentresQuery>,
) -> Result<Json<Vec<CentreWithDistance>>> {
    let centres = db::centres::list(&state.pool, query.category.as_deref()).await?;

    let mut result: Vec<CentreWithDistance> = centres
        .into_iter()
        .map(|centre| {
            let distance_km = match (query.latitude, query.longitude) {
                (Some(lat), Some(lon)) => {
                    Some(haversine_km(lat, lon, centre.latitude, centre.longitude))
                }
                _ => None,
            };
            CentreWithDistance { centre, distance_km }
        })
        .collect();

    if query.latitude.is_some() && query.longitude.is_some() {
        result.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    Ok(Json(result))
}

/// GET /api/v1/categories
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = db::centres::list_categories(&state.pool).await?;
    Ok(Json(categories))
}

/// Great-circle distance between two coordinates, in kilometers
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(51.5, -0.12, 51.5, -0.12) < 1e-9);
    }

    #[test]
    fn haversine_london_to_paris() {
        // ~344 km between the city centres
        let d = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 344.0).abs() < 5.0, "got {d}");
    }
}
