//! # Warden Events
//!
//! This crate provides the event sink the user lifecycle posts through,
//! together with the lifecycle event types.
//!
//! ## Overview
//!
//! The warden-events crate handles:
//! - **Event Types**: A generic envelope plus strongly-typed user lifecycle events
//! - **Event Bus**: Publish/subscribe messaging with topic patterns
//! - **Event Handlers**: Async event processing, registered and unregistered by id
//! - **Dead Letters**: Events nobody listens to are counted and logged
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust,no_run
//! use warden_events::{EventBus, MemoryEventBus, UserEvent};
//! use uuid::Uuid;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     // Create a typed event
//!     let banned = UserEvent::Banned {
//!         user_id: Uuid::now_v7(),
//!         banned_until: None,
//!     };
//!
//!     // Publish
//!     bus.publish(banned.to_event().unwrap()).await.unwrap();
//! }
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust,no_run
//! use warden_events::{EventBus, MemoryEventBus};
//!
//! async fn subscribe_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     // Subscribe to every user lifecycle event
//!     let mut sub = bus.subscribe("lifecycle.user.*").await.unwrap();
//!
//!     while let Ok(event) = sub.recv().await {
//!         println!("Received: {}", event.event_type);
//!     }
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `{source}.{event_type}`:
//! - `lifecycle.user.banned` - Specific event
//! - `lifecycle.user.*` - All user lifecycle events
//! - `#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod config;
pub mod types;

// Re-export main types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, MemoryEventBus,
    Subscription,
};
pub use config::{ConfigError, EventBusConfig};
pub use types::{Event, UserEvent, LIFECYCLE_SOURCE};
