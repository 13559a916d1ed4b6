//! Domain event types and EventBus
//!
//! State-changing operations emit typed events instead of relying on
//! implicit on-save hooks, so the side-effect chain (email, points award,
//! reminder scheduling, SSE push) is inspectable and testable in isolation
//! from the storage layer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::rewards::TierLevel;

/// Trash2Cash domain events
///
/// Events are broadcast via [`EventBus`] and can be serialized for SSE
/// transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A user confirmed an Available appointment
    ///
    /// Triggers:
    /// - Email: booking confirmation
    /// - Points award from the user's latest recycled item
    /// - Deferred task: reminder ahead of the appointment
    AppointmentBooked {
        appointment_id: Uuid,
        user_id: Uuid,
        centre_id: Uuid,
        /// Appointment start instant (local slot time resolved to UTC)
        starts_at: chrono::DateTime<chrono::Utc>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The assigned user cancelled a Booked appointment; the slot reverted
    /// to Available
    AppointmentCancelled {
        appointment_id: Uuid,
        user_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An appointment reached Completed (pickup arrival recorded, or
    /// drop-off fulfilled)
    ///
    /// Triggers:
    /// - Email: arrival/drop-off confirmation to the assigned user
    AppointmentCompleted {
        appointment_id: Uuid,
        user_id: Option<Uuid>,
        is_dropoff: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A profile's tier changed after a points update
    TierChanged {
        user_id: Uuid,
        old_tier: TierLevel,
        new_tier: TierLevel,
        /// Point total that produced the new tier
        points: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A notification row was appended for a user
    ///
    /// Triggers:
    /// - SSE: push to connected clients
    NotificationCreated {
        notification_id: Uuid,
        user_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DomainEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::AppointmentBooked { .. } => "AppointmentBooked",
            DomainEvent::AppointmentCancelled { .. } => "AppointmentCancelled",
            DomainEvent::AppointmentCompleted { .. } => "AppointmentCompleted",
            DomainEvent::TierChanged { .. } => "TierChanged",
            DomainEvent::NotificationCreated { .. } => "NotificationCreated",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DomainEvent,
    ) -> Result<usize, broadcast::error::SendError<DomainEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used by request handlers: a booking must succeed whether or not the
    /// side-effect pipeline is attached.
    pub fn emit_lossy(&self, event: DomainEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booked_event() -> DomainEvent {
        DomainEvent::AppointmentBooked {
            appointment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            centre_id: Uuid::new_v4(),
            starts_at: chrono::Utc::now(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn event_type_names_each_variant() {
        let events: Vec<(DomainEvent, &str)> = vec![
            (booked_event(), "AppointmentBooked"),
            (
                DomainEvent::AppointmentCancelled {
                    appointment_id: Uuid::new_v4(),
                    user_id: Uuid::new_v4(),
                    timestamp: chrono::Utc::now(),
                },
                "AppointmentCancelled",
            ),
            (
                DomainEvent::AppointmentCompleted {
                    appointment_id: Uuid::new_v4(),
                    user_id: None,
                    is_dropoff: false,
                    timestamp: chrono::Utc::now(),
                },
                "AppointmentCompleted",
            ),
            (
                DomainEvent::TierChanged {
                    user_id: Uuid::new_v4(),
                    old_tier: TierLevel::Bronze,
                    new_tier: TierLevel::Silver,
                    points: 3000,
                    timestamp: chrono::Utc::now(),
                },
                "TierChanged",
            ),
            (
                DomainEvent::NotificationCreated {
                    notification_id: Uuid::new_v4(),
                    user_id: Uuid::new_v4(),
                    timestamp: chrono::Utc::now(),
                },
                "NotificationCreated",
            ),
        ];

        for (event, expected) in events {
            assert_eq!(event.event_type(), expected);
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&booked_event()).unwrap();
        assert!(json.contains("\"type\":\"AppointmentBooked\""));

        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "AppointmentBooked");
    }

    #[test]
    fn emit_reaches_every_subscriber() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(booked_event()).expect("emit should succeed");

        assert_eq!(rx1.try_recv().unwrap().event_type(), "AppointmentBooked");
        assert_eq!(rx2.try_recv().unwrap().event_type(), "AppointmentBooked");
    }

    #[test]
    fn emit_lossy_tolerates_no_subscribers() {
        let bus = EventBus::new(2);
        // No subscribers: must not panic or error out the caller.
        bus.emit_lossy(booked_event());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 2);
    }
}
