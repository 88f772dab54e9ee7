//! Resource metadata and identity types
//!
//! Every storable resource carries an [`ObjectMeta`] holding its unique id,
//! its composite `(namespace, name)` key, and the generation counter used
//! for optimistic concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Composite key of a resource: `(namespace, name)`.
///
/// The namespace scopes the logical tenant or application, the name is
/// unique within it.
///
/// # Examples
///
/// ```
/// use warden_store::ResourceKey;
///
/// let key = ResourceKey::new("accounts", "bob");
/// assert_eq!(key.to_string(), "accounts/bob");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey {
    /// Namespace (tenant or application scope)
    pub namespace: String,
    /// Name, unique within the namespace
    pub name: String,
}

impl ResourceKey {
    /// Create a new composite key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Full identity of a stored resource, reported by duplicate conflicts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    /// Composite key
    pub key: ResourceKey,
    /// Unique identifier
    pub uid: Uuid,
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (uid {})", self.key, self.uid)
    }
}

/// Metadata shared by every stored resource.
///
/// # Examples
///
/// ```
/// use warden_store::ObjectMeta;
///
/// let meta = ObjectMeta::new("accounts", "bob");
/// assert_eq!(meta.generation, 0);
/// assert!(!meta.uid.is_nil());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Globally unique identifier, immutable once assigned.
    ///
    /// A nil uid presented to the store on first save is replaced
    /// with a freshly generated one.
    pub uid: Uuid,

    /// Namespace (tenant or application scope)
    pub namespace: String,

    /// Name, unique within the namespace
    pub name: String,

    /// Version counter, incremented by the store on every successful update
    pub generation: u64,

    /// When the resource was built
    pub created_at: DateTime<Utc>,

    /// When the store last accepted a write of this resource
    pub updated_at: DateTime<Utc>,
}

impl ObjectMeta {
    /// Create metadata with a new UUID v7, generation 0 and current timestamps.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::now_v7(),
            namespace: namespace.into(),
            name: name.into(),
            generation: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Use an explicit uid (pass `Uuid::nil()` to let the store assign one).
    pub fn with_uid(mut self, uid: Uuid) -> Self {
        self.uid = uid;
        self
    }

    /// Declare the generation this write is based on.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Composite key of this resource.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Identity (key plus uid) of this resource.
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            key: self.key(),
            uid: self.uid,
        }
    }
}

/// A value the store can hold.
///
/// Implementors only expose their metadata; key and identity are derived.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Resource metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Mutable resource metadata (used by the store to assign uid and generation).
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Composite key.
    fn key(&self) -> ResourceKey {
        self.meta().key()
    }

    /// Identity (key plus uid).
    fn identity(&self) -> ResourceIdentity {
        self.meta().identity()
    }
}
