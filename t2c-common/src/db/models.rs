//! Database models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::rewards::TierLevel;

/// Appointment lifecycle status
///
/// Slots are created as `Available`/`Temporary` by the scheduling process,
/// move to `Booked` on confirmation, to `Completed` on fulfillment, and back
/// to `Available` on cancellation. `Temporary` slots are purged by the sweep
/// once stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Available,
    Booked,
    Completed,
    Pending,
    Temporary,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Available => "Available",
            AppointmentStatus::Booked => "Booked",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Temporary => "Temporary",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(AppointmentStatus::Available),
            "Booked" => Some(AppointmentStatus::Booked),
            "Completed" => Some(AppointmentStatus::Completed),
            "Pending" => Some(AppointmentStatus::Pending),
            "Temporary" => Some(AppointmentStatus::Temporary),
            "Cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// One-to-one extension of a user: address, points balance, tier, flags.
///
/// Invariant: `tier` is always consistent with `points` under the configured
/// threshold table; the profile service recomputes it on every points change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub street: String,
    pub city: String,
    pub postcode: String,
    pub points: i64,
    pub tier: TierLevel,
    pub is_verified: bool,
    pub is_seller: bool,
    pub request_seller: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecyclingCentre {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// A booking slot at a recycling centre.
///
/// Invariants:
/// - a row with no assigned user is `Available` or `Temporary`
/// - drop-off rows never carry an `arrival_time`; a pickup gaining one is
///   forced to `Completed` exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub centre_id: Uuid,
    pub category: Option<String>,
    pub item_weight_kg: Option<f64>,
    pub points_earned: Option<i64>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub is_dropoff: bool,
    pub driver_id: Option<Uuid>,
    /// Pickups only: when the driver delivered the items to the centre
    pub arrival_time: Option<NaiveTime>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The slot's start instant. Slot date/time are stored naive; the
    /// service treats them as UTC.
    pub fn starts_at(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.date.and_time(self.time), Utc)
    }
}

/// Recyclable item identified by the vision-classification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub user_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub category: String,
    pub confidence: f64,
    pub description: Option<String>,
    pub weight_kg: f64,
    /// Raw label array from the classifier: `[{description, score}, ..]`
    pub labels: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Append-only user notification; only `is_read` is ever mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Minimum tier eligible to claim this voucher
    pub tier: TierLevel,
    /// Points cost to redeem
    pub points: i64,
    pub discount_amt: f64,
    pub centre_id: Uuid,
    pub claimed_count: i64,
    pub claimable_count: i64,
    pub expiration_date: NaiveDate,
    pub is_active: bool,
}

/// A per-user claim of a voucher definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherInstance {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub user_id: Uuid,
    pub claimed_on: NaiveDate,
    pub redeemed: bool,
    /// Guard against duplicate expiry notifications across sweep runs
    pub reminder_sent: bool,
}

/// Registration one-time code, valid for a short window after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Otp {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}
