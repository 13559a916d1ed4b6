//! Configuration loading
//!
//! The rewards schedule (tier thresholds, category multipliers, expiry
//! windows) is an explicit, injectable table rather than inline literals, so
//! tests can run against varied schedules. Loaded from a TOML file resolved
//! by priority order, with compiled defaults as the fallback.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::rewards::TierLevel;
use crate::{Error, Result};

/// One row of the tier threshold table
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierThreshold {
    /// Minimum cumulative points for this tier
    pub min_points: i64,
    pub tier: TierLevel,
}

/// Rewards schedule: thresholds, multipliers and timing windows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Tier thresholds in ascending point order
    pub tier_thresholds: Vec<TierThreshold>,
    /// Points earned per kilogram, by item category
    pub category_points_per_kg: HashMap<String, i64>,
    /// How long before an appointment the reminder fires
    pub reminder_lead_minutes: i64,
    /// Voucher expiry reminders go out this many days before expiration
    pub voucher_reminder_days: i64,
    /// Temporary appointments not updated within this window are purged
    pub temporary_expiry_minutes: i64,
    /// Registration OTP codes expire after this many minutes
    pub otp_expiry_minutes: i64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            tier_thresholds: vec![
                TierThreshold { min_points: 0, tier: TierLevel::Bronze },
                TierThreshold { min_points: 3000, tier: TierLevel::Silver },
                TierThreshold { min_points: 5000, tier: TierLevel::Gold },
                TierThreshold { min_points: 7500, tier: TierLevel::Platinum },
            ],
            // Buy-back rates modeled on local recycling centre price lists
            category_points_per_kg: HashMap::from([
                ("paper".to_string(), 10),
                ("plastic".to_string(), 11),
                ("metal".to_string(), 20),
                ("cardboard".to_string(), 12),
                ("e-waste".to_string(), 25),
                ("clothes".to_string(), 5),
                ("glass".to_string(), 8),
            ]),
            reminder_lead_minutes: 60,
            voucher_reminder_days: 3,
            temporary_expiry_minutes: 1,
            otp_expiry_minutes: 5,
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Transactional email gateway endpoint; emails are logged-only when unset
    pub email_gateway_url: Option<String>,
    /// Sender address stamped on outgoing mail
    pub email_from: Option<String>,
    /// Minutes between runs of the periodic sweeps (voucher expiry, stale
    /// Temporary appointments, expired OTPs)
    pub sweep_interval_minutes: Option<i64>,
    pub rewards: RewardsConfig,
}

impl AppConfig {
    pub fn sweep_interval_minutes(&self) -> i64 {
        self.sweep_interval_minutes.unwrap_or(60)
    }
}

/// Resolve the config file path by priority order:
/// 1. Command-line argument (highest priority)
/// 2. `T2C_CONFIG` environment variable
/// 3. `trash2cash.toml` in the working directory
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(cli_arg: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(PathBuf::from(path));
    }

    if let Ok(path) = std::env::var("T2C_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from("trash2cash.toml");
    if local.exists() {
        return Some(local);
    }

    None
}

/// Load configuration from the resolved file, or compiled defaults when no
/// file is present. A file that exists but fails to parse is a hard error
/// rather than a silent fallback.
pub fn load_config(cli_arg: Option<&str>) -> Result<AppConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
        }
        None => Ok(AppConfig::default()),
    }
}
