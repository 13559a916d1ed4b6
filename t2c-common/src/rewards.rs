//! Rewards math: loyalty tiers and points-per-kilogram
//!
//! Pure functions over the injectable [`RewardsConfig`](crate::config::RewardsConfig)
//! schedule, so the tier engine can be tested against varied threshold tables.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::RewardsConfig;

/// Loyalty tier derived from cumulative points.
///
/// Ordering is significant: `Bronze < Silver < Gold < Platinum`. The derived
/// `Ord` drives the upgrade-vs-demotion wording on tier change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TierLevel {
    /// Tier name as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            TierLevel::Bronze => "Bronze",
            TierLevel::Silver => "Silver",
            TierLevel::Gold => "Gold",
            TierLevel::Platinum => "Platinum",
        }
    }

    /// Parse a stored tier name; unknown values fall back to `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Bronze" => Some(TierLevel::Bronze),
            "Silver" => Some(TierLevel::Silver),
            "Gold" => Some(TierLevel::Gold),
            "Platinum" => Some(TierLevel::Platinum),
            _ => None,
        }
    }

    /// The next tier up, if any (used for "points to next tier" summaries)
    pub fn next(&self) -> Option<TierLevel> {
        match self {
            TierLevel::Bronze => Some(TierLevel::Silver),
            TierLevel::Silver => Some(TierLevel::Gold),
            TierLevel::Gold => Some(TierLevel::Platinum),
            TierLevel::Platinum => None,
        }
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a point total to its tier: the tier with the highest threshold not
/// exceeding `points`. Deterministic; totals below every threshold map to
/// the lowest tier.
pub fn tier_for_points(points: i64, config: &RewardsConfig) -> TierLevel {
    let mut result = TierLevel::Bronze;
    for threshold in &config.tier_thresholds {
        if points >= threshold.min_points {
            result = threshold.tier;
        }
    }
    result
}

/// Points awarded for recycling an item: category multiplier x weight in kg,
/// truncated to a whole number. Categories missing from the schedule
/// contribute zero.
pub fn points_for_item(category: &str, weight_kg: f64, config: &RewardsConfig) -> i64 {
    let multiplier = config
        .category_points_per_kg
        .get(category)
        .copied()
        .unwrap_or(0);
    (weight_kg * multiplier as f64) as i64
}

/// When a reminder for an appointment starting at `starts_at` should fire:
/// `lead` before the appointment, clamped to `now` so the eta is never in
/// the past.
pub fn reminder_eta(starts_at: DateTime<Utc>, now: DateTime<Utc>, lead: Duration) -> DateTime<Utc> {
    let eta = starts_at - lead;
    if eta > now {
        eta
    } else {
        now
    }
}
