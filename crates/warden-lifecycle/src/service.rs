//! User lifecycle service
//!
//! Loads a user from the store, runs one state transition and saves the
//! result. Optimistic-lock conflicts propagate to the caller; nothing is
//! retried here.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use warden_abac::{OwnershipPolicyEngine, PolicySet, Subject};
use warden_store::{ResourceStore, StoreError};

use crate::error::LifecycleResult;
use crate::state::{Operation, StateKind, UserState, UserStateFactory};
use crate::user::User;

/// Lifecycle operations over stored users.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use warden_events::MemoryEventBus;
/// use warden_lifecycle::{StateKind, User, UserLifecycleService, UserStateFactory};
/// use warden_store::MemoryStore;
///
/// # async fn example() -> warden_lifecycle::LifecycleResult<()> {
/// let service = UserLifecycleService::new(
///     Arc::new(MemoryStore::new()),
///     UserStateFactory::new(Arc::new(MemoryEventBus::new())),
/// );
///
/// let bob = service.register(User::new("accounts", "bob")).await?;
/// let state = service.ban(bob.uid()).await?;
/// assert_eq!(state.kind(), StateKind::Banned);
/// # Ok(())
/// # }
/// ```
pub struct UserLifecycleService {
    store: Arc<dyn ResourceStore<User>>,
    factory: UserStateFactory,
    engine: OwnershipPolicyEngine,
    policies: PolicySet,
}

impl UserLifecycleService {
    /// Create a service with no access policies.
    pub fn new(store: Arc<dyn ResourceStore<User>>, factory: UserStateFactory) -> Self {
        Self {
            store,
            factory,
            engine: OwnershipPolicyEngine::new(),
            policies: PolicySet::default(),
        }
    }

    /// Set the policies consulted by [`authorize`](Self::authorize).
    pub fn with_policies(mut self, engine: OwnershipPolicyEngine, policies: PolicySet) -> Self {
        self.engine = engine;
        self.policies = policies;
        self
    }

    /// The state factory.
    pub fn factory(&self) -> &UserStateFactory {
        &self.factory
    }

    /// Store a new user.
    pub async fn register(&self, user: User) -> LifecycleResult<User> {
        let saved = self.store.save(user).await?;
        tracing::info!(user_id = %saved.uid(), user = %saved.meta.key(), "User registered");
        Ok(saved)
    }

    /// Load a user by uid.
    pub async fn load(&self, uid: Uuid) -> LifecycleResult<User> {
        self.store
            .find_by_uid(uid)
            .await?
            .ok_or_else(|| StoreError::uid_not_found(uid).into())
    }

    /// Load a user and resolve its current state.
    pub async fn state(&self, uid: Uuid) -> LifecycleResult<UserState> {
        Ok(self.factory.resolve(self.load(uid).await?))
    }

    /// Detain a user for `days` days.
    pub async fn detain(&self, uid: Uuid, days: i64) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Detain { days }).await
    }

    /// Ban a user permanently.
    pub async fn ban(&self, uid: Uuid) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Ban { until: None }).await
    }

    /// Ban a user until `until`.
    pub async fn ban_until(&self, uid: Uuid, until: DateTime<Utc>) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Ban { until: Some(until) }).await
    }

    /// Lift a user's detention or ban.
    pub async fn release(&self, uid: Uuid) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Release).await
    }

    /// Soft-delete a user.
    pub async fn delete(&self, uid: Uuid) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Delete).await
    }

    /// Revert a user's soft deletion.
    pub async fn activate(&self, uid: Uuid) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Activate).await
    }

    /// File a petition against a user.
    pub async fn petition(&self, uid: Uuid, petition_id: Uuid) -> LifecycleResult<UserState> {
        self.run(uid, Operation::Petition { petition_id }).await
    }

    /// Remove a user.
    ///
    /// With `delete` the record is purged from the store; otherwise personal
    /// data is cleared and the record kept. A detained user is only marked
    /// deleted. Either way a write that landed after the load fails with
    /// [`StoreError::OptimisticLockConflict`].
    pub async fn remove(&self, uid: Uuid, delete: bool) -> LifecycleResult<UserState> {
        let user = self.load(uid).await?;
        let state = self.factory.resolve(user.clone());
        let from = state.kind();
        let mut state = state.remove(delete).await?;

        if from == StateKind::Removed || state.kind() != StateKind::Removed {
            return self.persist(&user, state).await;
        }

        if delete {
            // Purge only the generation the transition was computed from
            self.store
                .remove_if_generation(uid, user.meta.generation)
                .await?
                .ok_or_else(|| StoreError::uid_not_found(uid))?;
            tracing::info!(user_id = %uid, "User purged");
            Ok(state)
        } else {
            state.user_mut().anonymize();
            self.persist(&user, state).await
        }
    }

    /// Check whether `subject` may perform `action` on the stored user.
    ///
    /// Without configured policies every request is denied.
    pub async fn authorize(&self, subject: &Subject, uid: Uuid, action: &str) -> LifecycleResult<bool> {
        let user = self.load(uid).await?;
        Ok(self.policies.allows(&self.engine, subject, &user, action))
    }

    async fn run(&self, uid: Uuid, op: Operation) -> LifecycleResult<UserState> {
        let user = self.load(uid).await?;
        let state = self.factory.resolve(user.clone()).apply(op).await?;
        self.persist(&user, state).await
    }

    // Saves only when the transition changed the user
    async fn persist(&self, before: &User, mut state: UserState) -> LifecycleResult<UserState> {
        if state.user() != before {
            let saved = self.store.save(state.user().clone()).await?;
            *state.user_mut() = saved;
        }
        Ok(state)
    }
}

impl std::fmt::Debug for UserLifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLifecycleService")
            .field("factory", &self.factory)
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use warden_abac::PolicyTuple;
    use warden_events::MemoryEventBus;
    use warden_store::{MemoryStore, StoreResult};

    /// Store where another writer updates the user right after the next read.
    struct InterleavedStore {
        inner: MemoryStore<User>,
        interleave: AtomicBool,
    }

    #[async_trait]
    impl ResourceStore<User> for InterleavedStore {
        async fn find_by_key(&self, namespace: &str, name: &str) -> StoreResult<Option<User>> {
            self.inner.find_by_key(namespace, name).await
        }

        async fn find_by_uid(&self, uid: Uuid) -> StoreResult<Option<User>> {
            let found = self.inner.find_by_uid(uid).await?;
            if let Some(user) = &found {
                if self.interleave.swap(false, Ordering::SeqCst) {
                    let concurrent = user.clone().with_display_name("Concurrent");
                    self.inner.save(concurrent).await?;
                }
            }
            Ok(found)
        }

        async fn save(&self, user: User) -> StoreResult<User> {
            self.inner.save(user).await
        }

        async fn remove_if_generation(
            &self,
            uid: Uuid,
            expected_generation: u64,
        ) -> StoreResult<Option<User>> {
            self.inner.remove_if_generation(uid, expected_generation).await
        }

        async fn remove_by_key(&self, namespace: &str, name: &str) -> StoreResult<Option<User>> {
            self.inner.remove_by_key(namespace, name).await
        }

        async fn remove_by_uid(&self, uid: Uuid) -> StoreResult<Option<User>> {
            self.inner.remove_by_uid(uid).await
        }

        async fn list(&self, namespace: &str) -> StoreResult<Vec<User>> {
            self.inner.list(namespace).await
        }

        async fn len(&self) -> StoreResult<usize> {
            self.inner.len().await
        }
    }

    fn service() -> (UserLifecycleService, MemoryStore<User>) {
        let store = MemoryStore::new();
        let factory = UserStateFactory::new(Arc::new(MemoryEventBus::new()));
        (UserLifecycleService::new(Arc::new(store.clone()), factory), store)
    }

    #[tokio::test]
    async fn test_transition_is_persisted() {
        let (service, store) = service();
        let bob = service.register(User::new("ns", "bob")).await.unwrap();
        assert_eq!(bob.meta.generation, 0);

        let state = service.detain(bob.uid(), 2).await.unwrap();
        assert_eq!(state.kind(), StateKind::Detained);
        assert_eq!(state.user().meta.generation, 1);

        let stored = store.find_by_uid(bob.uid()).await.unwrap().unwrap();
        assert_eq!(&stored, state.user());
        assert_eq!(service.state(bob.uid()).await.unwrap().kind(), StateKind::Detained);
    }

    #[tokio::test]
    async fn test_noop_is_not_saved() {
        let (service, _store) = service();
        let bob = service.register(User::new("ns", "bob")).await.unwrap();

        let state = service.activate(bob.uid()).await.unwrap();
        assert_eq!(state.kind(), StateKind::Active);
        assert_eq!(state.user().meta.generation, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let (service, _store) = service();
        let err = service.ban(Uuid::now_v7()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_stale_user_conflicts() {
        let (service, store) = service();
        let bob = service.register(User::new("ns", "bob")).await.unwrap();
        service.ban(bob.uid()).await.unwrap();

        // A writer still holding generation 0 loses
        let err = store.save(bob).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::OptimisticLockConflict {
                stored_generation: 1,
                attempted_generation: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_remove_with_delete_purges() {
        let (service, store) = service();
        let bob = service.register(User::new("ns", "bob")).await.unwrap();

        let state = service.remove(bob.uid(), true).await.unwrap();
        assert_eq!(state.kind(), StateKind::Removed);
        assert!(store.find_by_uid(bob.uid()).await.unwrap().is_none());

        let err = service.remove(bob.uid(), true).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_purge_after_concurrent_update_conflicts() {
        let inner = MemoryStore::new();
        let store = Arc::new(InterleavedStore {
            inner: inner.clone(),
            interleave: AtomicBool::new(false),
        });
        let factory = UserStateFactory::new(Arc::new(MemoryEventBus::new()));
        let service = UserLifecycleService::new(store.clone(), factory);
        let bob = service.register(User::new("ns", "bob")).await.unwrap();

        store.interleave.store(true, Ordering::SeqCst);
        let err = service.remove(bob.uid(), true).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Store(StoreError::OptimisticLockConflict {
                stored_generation: 1,
                attempted_generation: 0
            })
        ));
        assert!(err.is_retryable());

        // The concurrent write survives
        let stored = inner.find_by_uid(bob.uid()).await.unwrap().unwrap();
        assert_eq!(stored.meta.generation, 1);
        assert_eq!(stored.display_name.as_deref(), Some("Concurrent"));
    }

    #[tokio::test]
    async fn test_remove_without_delete_anonymizes() {
        let (service, store) = service();
        let bob = service
            .register(User::new("ns", "bob").with_email("bob@example.com"))
            .await
            .unwrap();

        let state = service.remove(bob.uid(), false).await.unwrap();
        assert_eq!(state.kind(), StateKind::Removed);

        let stored = store.find_by_uid(bob.uid()).await.unwrap().unwrap();
        assert!(stored.email.is_none());
        assert!(stored.is_removed());

        // Removed users accept petitions only
        let state = service.delete(bob.uid()).await.unwrap();
        assert_eq!(state.user().meta.generation, stored.meta.generation);
    }

    #[tokio::test]
    async fn test_remove_detained_user_marks_deleted() {
        let (service, store) = service();
        let bob = service.register(User::new("ns", "bob")).await.unwrap();
        service.detain(bob.uid(), 5).await.unwrap();

        let state = service.remove(bob.uid(), true).await.unwrap();
        assert_eq!(state.kind(), StateKind::Deleted);

        let stored = store.find_by_uid(bob.uid()).await.unwrap().unwrap();
        assert!(stored.is_deleted());
        assert!(!stored.is_removed());
    }

    #[tokio::test]
    async fn test_invalid_argument_leaves_store_untouched() {
        let (service, store) = service();
        let bob = service.register(User::new("ns", "bob")).await.unwrap();

        let err = service.detain(bob.uid(), 0).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(store.find_by_uid(bob.uid()).await.unwrap().unwrap(), bob);
    }

    #[tokio::test]
    async fn test_authorize() {
        let (service, _store) = service();
        let policies: PolicySet = vec![PolicyTuple::parse("User", ["update"], "self", "USER").unwrap()]
            .into_iter()
            .collect();
        let service = service.with_policies(OwnershipPolicyEngine::new(), policies);

        let mary = service
            .register(User::new("ns", "mary").with_role("USER"))
            .await
            .unwrap();
        let andrew = service
            .register(User::new("ns", "andrew").with_role("USER"))
            .await
            .unwrap();

        assert!(service.authorize(&mary.to_subject(), mary.uid(), "update").await.unwrap());
        assert!(!service.authorize(&andrew.to_subject(), mary.uid(), "update").await.unwrap());
        assert!(!service.authorize(&mary.to_subject(), mary.uid(), "delete").await.unwrap());
    }

    #[tokio::test]
    async fn test_authorize_without_policies_denies() {
        let (service, _store) = service();
        let mary = service
            .register(User::new("ns", "mary").with_role("ADMIN"))
            .await
            .unwrap();
        assert!(!service.authorize(&mary.to_subject(), mary.uid(), "read").await.unwrap());
    }
}
