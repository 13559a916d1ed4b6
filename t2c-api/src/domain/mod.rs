//! Domain operations
//!
//! State transitions live here, between the HTTP handlers and the query
//! layer. Each operation validates preconditions, performs its conditional
//! write, appends notifications and emits typed events. Side effects that
//! leave the process (email, deferred reminders) are driven by the effects
//! pipeline subscribed to the bus, not called from here, so a transition
//! commits regardless of collaborator health.

pub mod appointments;
pub mod profiles;
pub mod vouchers;
