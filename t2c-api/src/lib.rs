//! Trash2Cash API service library
//!
//! Exposes the service internals (domain operations, side-effect pipeline,
//! task runner, HTTP layer) for integration tests; the `t2c-api` binary is a
//! thin wrapper in `main.rs`.

pub mod api;
pub mod db;
pub mod domain;
pub mod effects;
pub mod email;
pub mod error;
pub mod tasks;

pub use error::{Error, Result};
