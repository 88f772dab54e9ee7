//! # Warden Store
//!
//! This crate provides the versioned resource store of the Warden
//! governance core.
//!
//! ## Overview
//!
//! The warden-store crate handles:
//! - **Resources**: Values addressable by `(namespace, name)` and by uid
//! - **Optimistic Concurrency**: Generation checks on every write
//! - **Duplicate Detection**: One identity per composite key
//! - **Removal**: Idempotent removal by resource, key, or uid
//!
//! ## Write Rules
//!
//! ```text
//! save(resource)
//!   key unknown                       -> stored as-is
//!   key known, same uid, same gen     -> stored with gen + 1
//!   key known, same uid, other gen    -> OptimisticLockConflict
//!   key known, other uid              -> DuplicateResourceConflict
//! ```
//!
//! A failed write never changes the store.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_store::{MemoryStore, ObjectMeta, Resource, ResourceStore, StoreError};
//!
//! #[derive(Clone, Debug)]
//! struct Account {
//!     meta: ObjectMeta,
//! }
//!
//! impl Resource for Account {
//!     fn meta(&self) -> &ObjectMeta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut ObjectMeta { &mut self.meta }
//! }
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!     let read = store.save(Account { meta: ObjectMeta::new("ns", "bob") }).await.unwrap();
//!
//!     // First writer since read wins
//!     store.save(read.clone()).await.unwrap();
//!
//!     // Second writer with the same read is rejected
//!     let err = store.save(read).await.unwrap_err();
//!     assert!(matches!(err, StoreError::OptimisticLockConflict { .. }));
//! }
//! ```

pub mod error;
pub mod resource;
pub mod store;

// Re-export main types
pub use error::{StoreError, StoreResult};
pub use resource::{ObjectMeta, Resource, ResourceIdentity, ResourceKey};

pub use store::{MemoryStore, ResourceStore};
