//! Query modules, one per entity

pub mod appointments;
pub mod centres;
pub mod items;
pub mod notifications;
pub mod otps;
pub mod profiles;
pub mod users;
pub mod vouchers;

use crate::{Error, Result};
use uuid::Uuid;

/// Parse a uuid column; a malformed value means the row was written outside
/// this service and is treated as corruption, not user error.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("bad uuid in database: {e}")))
}

pub(crate) fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>> {
    s.as_deref().map(parse_uuid).transpose()
}
