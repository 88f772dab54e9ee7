//! Versioned store implementation
//!
//! This module provides the store abstraction and its in-memory
//! implementation. Writes are guarded by optimistic concurrency on the
//! resource generation and by duplicate detection on the composite key.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::resource::{Resource, ResourceKey};

/// Store trait for versioned resources.
///
/// Durable implementations must keep the same generation and duplicate
/// semantics as [`MemoryStore`] and report their own failures as
/// [`StoreError::Backend`].
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Look up a resource by its composite key.
    async fn find_by_key(&self, namespace: &str, name: &str) -> StoreResult<Option<R>>;

    /// Look up a resource by its uid.
    async fn find_by_uid(&self, uid: Uuid) -> StoreResult<Option<R>>;

    /// Insert or update a resource.
    ///
    /// - Unknown key: accepted as-is (a nil uid is replaced).
    /// - Known key, same uid, same generation: persisted with generation + 1.
    /// - Known key, same uid, other generation: [`StoreError::OptimisticLockConflict`].
    /// - Known key, other uid: [`StoreError::DuplicateResourceConflict`].
    /// - Stored generation at `u64::MAX`: [`StoreError::Backend`].
    ///
    /// Returns the resource as persisted.
    async fn save(&self, resource: R) -> StoreResult<R>;

    /// Remove a resource, guarded by the generation it was read at.
    ///
    /// Returns the removed value, or `None` if nothing is stored under its
    /// uid. A stored generation other than `resource`'s is an
    /// [`StoreError::OptimisticLockConflict`] and removes nothing.
    async fn remove(&self, resource: &R) -> StoreResult<Option<R>> {
        let meta = resource.meta();
        self.remove_if_generation(meta.uid, meta.generation).await
    }

    /// Remove a resource by uid only if it is still at `expected_generation`.
    async fn remove_if_generation(
        &self,
        uid: Uuid,
        expected_generation: u64,
    ) -> StoreResult<Option<R>>;

    /// Remove a resource by its composite key. Removing nothing is not an error.
    async fn remove_by_key(&self, namespace: &str, name: &str) -> StoreResult<Option<R>>;

    /// Remove a resource by its uid. Removing nothing is not an error.
    async fn remove_by_uid(&self, uid: Uuid) -> StoreResult<Option<R>>;

    /// All resources in a namespace, ordered by name.
    async fn list(&self, namespace: &str) -> StoreResult<Vec<R>>;

    /// Number of stored resources.
    async fn len(&self) -> StoreResult<usize>;

    /// Check if the store holds nothing.
    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Both lookup paths, always mutated under the same write guard.
///
/// `by_key` maps to uids only, so a resource value exists once and the two
/// paths cannot disagree on field values.
struct Indices<R> {
    by_key: HashMap<ResourceKey, Uuid>,
    by_uid: HashMap<Uuid, R>,
}

impl<R> Indices<R> {
    fn new() -> Self {
        Self {
            by_key: HashMap::new(),
            by_uid: HashMap::new(),
        }
    }
}

/// In-memory store implementation.
///
/// Writes are serialized by a single lock over both indices, so readers
/// never observe one index updated without the other. No I/O happens while
/// the lock is held.
///
/// # Example
///
/// ```rust,no_run
/// use warden_store::{MemoryStore, ObjectMeta, Resource, ResourceStore};
///
/// #[derive(Clone)]
/// struct Widget {
///     meta: ObjectMeta,
/// }
///
/// impl Resource for Widget {
///     fn meta(&self) -> &ObjectMeta { &self.meta }
///     fn meta_mut(&mut self) -> &mut ObjectMeta { &mut self.meta }
/// }
///
/// async fn example() {
///     let store = MemoryStore::new();
///     let saved = store.save(Widget { meta: ObjectMeta::new("ns", "gear") }).await.unwrap();
///     let found = store.find_by_key("ns", "gear").await.unwrap();
///     assert_eq!(found.map(|w| w.meta.uid), Some(saved.meta.uid));
/// }
/// ```
pub struct MemoryStore<R> {
    indices: Arc<RwLock<Indices<R>>>,
}

impl<R> std::fmt::Debug for MemoryStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl<R> Clone for MemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            indices: self.indices.clone(),
        }
    }
}

impl<R: Resource> MemoryStore<R> {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self {
            indices: Arc::new(RwLock::new(Indices::new())),
        }
    }
}

impl<R: Resource> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for MemoryStore<R> {
    async fn find_by_key(&self, namespace: &str, name: &str) -> StoreResult<Option<R>> {
        let key = ResourceKey::new(namespace, name);
        let indices = self.indices.read().await;
        Ok(indices
            .by_key
            .get(&key)
            .and_then(|uid| indices.by_uid.get(uid))
            .cloned())
    }

    async fn find_by_uid(&self, uid: Uuid) -> StoreResult<Option<R>> {
        let indices = self.indices.read().await;
        Ok(indices.by_uid.get(&uid).cloned())
    }

    async fn save(&self, mut resource: R) -> StoreResult<R> {
        let key = resource.key();
        let mut indices = self.indices.write().await;

        let Some(stored_uid) = indices.by_key.get(&key).copied() else {
            if resource.meta().uid.is_nil() {
                resource.meta_mut().uid = Uuid::now_v7();
            }
            let uid = resource.meta().uid;

            // A uid stored under another key would leave two keys for one uid
            if let Some(existing) = indices.by_uid.get(&uid) {
                tracing::warn!(
                    key = %key,
                    uid = %uid,
                    stored_key = %existing.key(),
                    "Rejected save: uid already stored under another key"
                );
                return Err(StoreError::DuplicateResourceConflict {
                    stored: existing.identity(),
                    incoming: resource.identity(),
                });
            }

            resource.meta_mut().updated_at = Utc::now();
            indices.by_key.insert(key.clone(), uid);
            indices.by_uid.insert(uid, resource.clone());

            tracing::debug!(
                key = %key,
                uid = %uid,
                generation = resource.meta().generation,
                "Resource created"
            );
            return Ok(resource);
        };

        let stored = indices
            .by_uid
            .get(&stored_uid)
            .ok_or_else(|| StoreError::Backend(format!("key {} has no stored value", key)))?;

        if stored_uid != resource.meta().uid {
            tracing::warn!(
                key = %key,
                stored_uid = %stored_uid,
                incoming_uid = %resource.meta().uid,
                "Rejected save: duplicate key"
            );
            return Err(StoreError::DuplicateResourceConflict {
                stored: stored.identity(),
                incoming: resource.identity(),
            });
        }

        let stored_generation = stored.meta().generation;
        let attempted_generation = resource.meta().generation;
        if stored_generation != attempted_generation {
            tracing::warn!(
                key = %key,
                stored_generation,
                attempted_generation,
                "Rejected save: optimistic lock conflict"
            );
            return Err(StoreError::OptimisticLockConflict {
                stored_generation,
                attempted_generation,
            });
        }

        let Some(next_generation) = stored_generation.checked_add(1) else {
            tracing::warn!(key = %key, stored_generation, "Rejected save: generation exhausted");
            return Err(StoreError::Backend(format!(
                "generation exhausted for {}",
                key
            )));
        };

        let meta = resource.meta_mut();
        meta.generation = next_generation;
        meta.updated_at = Utc::now();
        indices.by_uid.insert(stored_uid, resource.clone());

        tracing::debug!(
            key = %key,
            uid = %stored_uid,
            generation = resource.meta().generation,
            "Resource updated"
        );
        Ok(resource)
    }

    async fn remove_if_generation(
        &self,
        uid: Uuid,
        expected_generation: u64,
    ) -> StoreResult<Option<R>> {
        let mut indices = self.indices.write().await;

        let Some(stored_generation) = indices.by_uid.get(&uid).map(|r| r.meta().generation) else {
            return Ok(None);
        };
        if stored_generation != expected_generation {
            tracing::warn!(
                uid = %uid,
                stored_generation,
                attempted_generation = expected_generation,
                "Rejected remove: optimistic lock conflict"
            );
            return Err(StoreError::OptimisticLockConflict {
                stored_generation,
                attempted_generation: expected_generation,
            });
        }

        let removed = indices.by_uid.remove(&uid);
        if let Some(ref resource) = removed {
            indices.by_key.remove(&resource.key());
            tracing::debug!(key = %resource.key(), uid = %uid, generation = stored_generation, "Resource removed");
        }
        Ok(removed)
    }

    async fn remove_by_key(&self, namespace: &str, name: &str) -> StoreResult<Option<R>> {
        let key = ResourceKey::new(namespace, name);
        let mut indices = self.indices.write().await;

        let removed = indices
            .by_key
            .remove(&key)
            .and_then(|uid| indices.by_uid.remove(&uid));

        if removed.is_some() {
            tracing::debug!(key = %key, "Resource removed");
        }
        Ok(removed)
    }

    async fn remove_by_uid(&self, uid: Uuid) -> StoreResult<Option<R>> {
        let mut indices = self.indices.write().await;

        let removed = indices.by_uid.remove(&uid);
        if let Some(ref resource) = removed {
            indices.by_key.remove(&resource.key());
            tracing::debug!(key = %resource.key(), uid = %uid, "Resource removed");
        }
        Ok(removed)
    }

    async fn list(&self, namespace: &str) -> StoreResult<Vec<R>> {
        let indices = self.indices.read().await;

        let mut keys: Vec<&ResourceKey> = indices
            .by_key
            .keys()
            .filter(|key| key.namespace == namespace)
            .collect();
        keys.sort();

        Ok(keys
            .into_iter()
            .filter_map(|key| indices.by_key.get(key))
            .filter_map(|uid| indices.by_uid.get(uid))
            .cloned()
            .collect())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.indices.read().await.by_uid.len())
    }
}
