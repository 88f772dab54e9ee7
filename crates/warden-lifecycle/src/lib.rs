//! # Warden Lifecycle
//!
//! User lifecycle management: the user model, the state machine that moves
//! users between active, detained, banned, deleted and removed, and a
//! service that persists each transition through a versioned store.
//!
//! ## Overview
//!
//! - **User**: a stored resource with overlapping ban, detention and
//!   deletion markers
//! - **StateKind**: the single state those markers resolve to
//! - **UserState**: a user in a resolved state; operations consume it and
//!   return the next state
//! - **UserLifecycleService**: load, transition, save
//!
//! Every changing transition submits exactly one event to the injected
//! [`EventBus`](warden_events::EventBus) under the `lifecycle.user.*` topics.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_events::{EventBus, MemoryEventBus};
//! use warden_lifecycle::{LifecycleConfig, StateKind, User, UserLifecycleService, UserStateFactory};
//! use warden_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Arc::new(MemoryEventBus::new());
//!     let mut audit = bus.subscribe("lifecycle.user.*").await?;
//!
//!     let factory = UserStateFactory::new(bus).with_config(LifecycleConfig::from_env());
//!     let service = UserLifecycleService::new(Arc::new(MemoryStore::new()), factory);
//!
//!     let bob = service.register(User::new("accounts", "bob")).await?;
//!     let state = service.detain(bob.uid(), 7).await?;
//!     assert_eq!(state.kind(), StateKind::Detained);
//!
//!     let event = audit.recv().await?;
//!     assert_eq!(event.event_type, "user.detained");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod user;

// Re-export main types
pub use config::{ConfigError, LifecycleConfig};
pub use error::{LifecycleError, LifecycleResult};
pub use service::UserLifecycleService;
pub use state::{transition, Operation, StateKind, Transition, UserState, UserStateFactory};
pub use user::{User, USER_TYPE_NAME};
