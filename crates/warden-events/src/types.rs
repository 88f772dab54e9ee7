//! Event types for lifecycle notifications
//!
//! This module defines the event envelope and the user lifecycle events
//! submitted by the state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::bus::{EventBusError, EventBusResult};

/// Source name used for events emitted by the user lifecycle.
pub const LIFECYCLE_SOURCE: &str = "lifecycle";

/// Event envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing, tracing, and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "user.detained", "user.removed")
    pub event_type: String,

    /// Emitting component
    pub source: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Namespace of the resource the event is about
    pub namespace: Option<String>,

    /// User the event is about
    pub user_id: Option<Uuid>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event type string
    /// * `source` - The emitting component
    /// * `payload` - The event payload
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            source: source.into(),
            timestamp: Utc::now(),
            namespace: None,
            user_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set namespace context.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set user context.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the topic for this event.
    ///
    /// Topics are structured as: `{source}.{event_type}`
    pub fn topic(&self) -> String {
        format!("{}.{}", self.source, self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// User lifecycle events.
///
/// Exactly one of these is submitted per state-changing transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    /// User was detained (or detention was refreshed)
    Detained {
        user_id: Uuid,
        detained_until: DateTime<Utc>,
    },
    /// User was banned; `banned_until` is `None` for a permanent ban
    Banned {
        user_id: Uuid,
        banned_until: Option<DateTime<Utc>>,
    },
    /// User was soft-deleted
    Deleted {
        user_id: Uuid,
        deleted_at: DateTime<Utc>,
    },
    /// Detention or ban was lifted
    Released { user_id: Uuid },
    /// Soft deletion was reverted
    Undeleted { user_id: Uuid },
    /// User was removed; `delete` tells whether data is purged or anonymized
    Removed { user_id: Uuid, delete: bool },
    /// An arbitration petition was filed against the user
    Petitioned { user_id: Uuid, petition_id: Uuid },
}

impl UserEvent {
    /// Event type string for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Detained { .. } => "user.detained",
            UserEvent::Banned { .. } => "user.banned",
            UserEvent::Deleted { .. } => "user.deleted",
            UserEvent::Released { .. } => "user.released",
            UserEvent::Undeleted { .. } => "user.undeleted",
            UserEvent::Removed { .. } => "user.removed",
            UserEvent::Petitioned { .. } => "user.petitioned",
        }
    }

    /// The user this event is about.
    pub fn user_id(&self) -> Uuid {
        match self {
            UserEvent::Detained { user_id, .. }
            | UserEvent::Banned { user_id, .. }
            | UserEvent::Deleted { user_id, .. }
            | UserEvent::Released { user_id }
            | UserEvent::Undeleted { user_id }
            | UserEvent::Removed { user_id, .. }
            | UserEvent::Petitioned { user_id, .. } => *user_id,
        }
    }

    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let payload = serde_json::to_value(self)
            .map_err(|e| EventBusError::SerializationError(e.to_string()))?;
        Ok(Event::new(self.event_type(), LIFECYCLE_SOURCE, payload).with_user(self.user_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let payload = serde_json::json!({"key": "value"});
        let user_id = Uuid::now_v7();
        let event = Event::new("test.event", "tests", payload)
            .with_namespace("accounts")
            .with_user(user_id)
            .with_correlation_id("req-1");

        assert_eq!(event.event_type, "test.event");
        assert_eq!(event.source, "tests");
        assert_eq!(event.namespace.as_deref(), Some("accounts"));
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.correlation_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_event_topic() {
        let event = Event::new("user.banned", LIFECYCLE_SOURCE, serde_json::json!({}));
        assert_eq!(event.topic(), "lifecycle.user.banned");
    }

    #[test]
    fn test_user_event_conversion() {
        let user_id = Uuid::now_v7();
        let event = UserEvent::Removed {
            user_id,
            delete: true,
        }
        .to_event()
        .unwrap();

        assert_eq!(event.event_type, "user.removed");
        assert_eq!(event.source, LIFECYCLE_SOURCE);
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.payload["type"], "removed");
        assert_eq!(event.payload["delete"], true);
    }

    #[test]
    fn test_user_event_payload_roundtrip() {
        let original = UserEvent::Petitioned {
            user_id: Uuid::now_v7(),
            petition_id: Uuid::now_v7(),
        };
        let event = original.to_event().unwrap();
        let parsed: UserEvent = event.parse_payload().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_event_types_are_distinct() {
        let user_id = Uuid::now_v7();
        let now = Utc::now();
        let events = [
            UserEvent::Detained { user_id, detained_until: now },
            UserEvent::Banned { user_id, banned_until: None },
            UserEvent::Deleted { user_id, deleted_at: now },
            UserEvent::Released { user_id },
            UserEvent::Undeleted { user_id },
            UserEvent::Removed { user_id, delete: false },
            UserEvent::Petitioned { user_id, petition_id: Uuid::now_v7() },
        ];

        let mut types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), events.len());
        assert!(events.iter().all(|e| e.user_id() == user_id));
    }
}
