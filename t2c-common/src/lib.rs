//! # Trash2Cash Common Library
//!
//! Shared code for the Trash2Cash backend including:
//! - Database models and schema initialization
//! - Domain event types (DomainEvent enum) and EventBus
//! - Rewards math (tier thresholds, points-per-kilogram)
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod rewards;

pub use error::{Error, Result};
pub use rewards::TierLevel;
