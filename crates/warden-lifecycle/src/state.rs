//! # User State Machine
//!
//! A [`UserState`] wraps a [`User`] together with its resolved [`StateKind`]
//! and the event bus transitions report to. Every operation consumes the
//! state and returns the successor; the wrapped user is mutated in place and
//! must be persisted by the caller.
//!
//! ```text
//!            detain             ban
//!   Active ---------> Detained -----> Banned
//!     |  ^  release      |              |
//!     |  |               | delete       | delete / remove
//!     |  +---------------+------+       v
//!     |        activate         +--> Deleted --remove--> Removed
//!     +---------------------------------------------------^
//!                            remove
//! ```
//!
//! Each changing transition submits exactly one [`UserEvent`]. No-op
//! transitions submit nothing. A removed user accepts only petitions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use warden_events::{EventBus, UserEvent};

use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::user::User;

/// Resolved lifecycle state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// No restriction
    Active,
    /// Temporarily restricted until the detention lapses
    Detained,
    /// Banned permanently or until an instant
    Banned,
    /// Soft-deleted, may be reactivated
    Deleted,
    /// Terminal
    Removed,
}

impl StateKind {
    /// Resolve the current state from the user's markers at `now`.
    ///
    /// A ban outranks deletion, and deletion outranks detention.
    pub fn resolve_at(user: &User, now: DateTime<Utc>) -> Self {
        if user.is_removed() {
            StateKind::Removed
        } else if user.is_active_at(now) {
            StateKind::Active
        } else if user.is_banned_at(now) {
            StateKind::Banned
        } else if user.is_detained_at(now) && !user.is_deleted() {
            StateKind::Detained
        } else {
            StateKind::Deleted
        }
    }

    /// Resolve the current state now.
    pub fn resolve(user: &User) -> Self {
        Self::resolve_at(user, Utc::now())
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Active => "active",
            StateKind::Detained => "detained",
            StateKind::Banned => "banned",
            StateKind::Deleted => "deleted",
            StateKind::Removed => "removed",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle operation with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Detain for a number of days from now
    Detain { days: i64 },
    /// Ban permanently (`None`) or until an instant
    Ban { until: Option<DateTime<Utc>> },
    /// Lift detention or ban
    Release,
    /// Soft-delete
    Delete,
    /// Revert a soft deletion
    Activate,
    /// Remove; `delete` purges data instead of anonymizing
    Remove { delete: bool },
    /// File an arbitration petition
    Petition { petition_id: Uuid },
}

impl Operation {
    /// Operation name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Detain { .. } => "detain",
            Operation::Ban { until: None } => "ban",
            Operation::Ban { until: Some(_) } => "ban_until",
            Operation::Release => "release",
            Operation::Delete => "delete",
            Operation::Activate => "activate",
            Operation::Remove { .. } => "remove",
            Operation::Petition { .. } => "petition",
        }
    }
}

/// Result of applying one operation to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the operation
    pub to: StateKind,
    /// Event to submit, `None` for a no-op
    pub event: Option<UserEvent>,
}

impl Transition {
    fn to(to: StateKind, event: UserEvent) -> Self {
        Self {
            to,
            event: Some(event),
        }
    }

    fn noop(state: StateKind) -> Self {
        Self {
            to: state,
            event: None,
        }
    }
}

/// Apply `op` to `user` in state `from` at `now`.
///
/// Arguments are validated before anything is mutated. On error the user is
/// left untouched.
pub fn transition(
    from: StateKind,
    op: Operation,
    user: &mut User,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> LifecycleResult<Transition> {
    let user_id = user.uid();

    let outcome = match (from, op) {
        (_, Operation::Petition { petition_id }) => {
            user.petitions.push(petition_id);
            Transition::to(
                from,
                UserEvent::Petitioned {
                    user_id,
                    petition_id,
                },
            )
        }

        (StateKind::Removed, _) => {
            tracing::debug!(user_id = %user_id, operation = op.name(), "Ignoring operation on removed user");
            Transition::noop(from)
        }

        (StateKind::Active | StateKind::Detained | StateKind::Banned, Operation::Activate) => {
            Transition::noop(from)
        }

        (StateKind::Active | StateKind::Detained | StateKind::Banned, Operation::Detain { days }) => {
            let detained_until = detention_end(from, days, now, config)?;
            user.detained_until = Some(detained_until);
            // A ban outranks the detention it records
            let to = if from == StateKind::Banned {
                StateKind::Banned
            } else {
                StateKind::Detained
            };
            Transition::to(
                to,
                UserEvent::Detained {
                    user_id,
                    detained_until,
                },
            )
        }
        (StateKind::Deleted, Operation::Detain { days }) => {
            detention_end(from, days, now, config)?;
            Transition::noop(from)
        }

        (_, Operation::Ban { until }) => {
            if until.is_some_and(|until| until <= now) {
                return Err(invalid(from, op, "ban must end in the future".to_string()));
            }
            apply_ban(user, until);
            let to = if from == StateKind::Deleted {
                StateKind::Deleted
            } else {
                StateKind::Banned
            };
            Transition::to(
                to,
                UserEvent::Banned {
                    user_id,
                    banned_until: until,
                },
            )
        }

        (StateKind::Active, Operation::Release) => {
            Transition::to(StateKind::Active, UserEvent::Released { user_id })
        }
        (StateKind::Detained, Operation::Release) => {
            user.detained_until = None;
            Transition::to(
                StateKind::resolve_at(user, now),
                UserEvent::Released { user_id },
            )
        }
        (StateKind::Banned, Operation::Release) => {
            user.banned_forever = false;
            user.banned_until = None;
            user.detained_until = None;
            Transition::to(
                StateKind::resolve_at(user, now),
                UserEvent::Released { user_id },
            )
        }
        (StateKind::Deleted, Operation::Release) => Transition::noop(from),

        (StateKind::Detained, Operation::Delete | Operation::Remove { .. }) => {
            tracing::warn!(
                user_id = %user_id,
                operation = op.name(),
                detained_until = ?user.detained_until,
                "User is detained; marking deleted, removal must wait for detention to lapse"
            );
            user.deleted_at = Some(now);
            Transition::to(
                StateKind::Deleted,
                UserEvent::Deleted {
                    user_id,
                    deleted_at: now,
                },
            )
        }
        (StateKind::Active | StateKind::Banned, Operation::Delete) => {
            user.deleted_at = Some(now);
            Transition::to(
                StateKind::Deleted,
                UserEvent::Deleted {
                    user_id,
                    deleted_at: now,
                },
            )
        }
        (StateKind::Deleted, Operation::Delete) => Transition::noop(from),

        (StateKind::Active | StateKind::Banned | StateKind::Deleted, Operation::Remove { delete }) => {
            user.deleted_at = user.deleted_at.or(Some(now));
            user.removed_at = Some(now);
            Transition::to(StateKind::Removed, UserEvent::Removed { user_id, delete })
        }

        (StateKind::Deleted, Operation::Activate) => {
            user.deleted_at = None;
            Transition::to(
                StateKind::resolve_at(user, now),
                UserEvent::Undeleted { user_id },
            )
        }
    };

    Ok(outcome)
}

fn invalid(state: StateKind, op: Operation, reason: String) -> LifecycleError {
    LifecycleError::InvalidTransition {
        state,
        operation: op.name(),
        reason,
    }
}

fn detention_end(
    state: StateKind,
    days: i64,
    now: DateTime<Utc>,
    config: &LifecycleConfig,
) -> LifecycleResult<DateTime<Utc>> {
    let op = Operation::Detain { days };
    if days <= 0 {
        return Err(invalid(state, op, "detention must be at least one day".to_string()));
    }
    if days > config.max_detention_days {
        return Err(invalid(
            state,
            op,
            format!(
                "detention of {} days exceeds the maximum of {}",
                days, config.max_detention_days
            ),
        ));
    }
    Duration::try_days(days)
        .and_then(|duration| now.checked_add_signed(duration))
        .ok_or_else(|| invalid(state, op, "detention end is out of range".to_string()))
}

// A new ban replaces whatever ban was in place
fn apply_ban(user: &mut User, until: Option<DateTime<Utc>>) {
    match until {
        None => {
            user.banned_forever = true;
            user.banned_until = None;
        }
        Some(until) => {
            user.banned_forever = false;
            user.banned_until = Some(until);
        }
    }
}

/// Builds [`UserState`] values that share one event bus and configuration.
#[derive(Clone)]
pub struct UserStateFactory {
    events: Arc<dyn EventBus>,
    config: LifecycleConfig,
}

impl UserStateFactory {
    /// Create a factory publishing to `events`.
    pub fn new(events: Arc<dyn EventBus>) -> Self {
        Self {
            events,
            config: LifecycleConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// The factory's configuration.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Wrap a user in its current state.
    pub fn resolve(&self, user: User) -> UserState {
        self.resolve_at(user, Utc::now())
    }

    /// Wrap a user in its state as of `now`.
    pub fn resolve_at(&self, user: User, now: DateTime<Utc>) -> UserState {
        UserState {
            kind: StateKind::resolve_at(&user, now),
            user,
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl fmt::Debug for UserStateFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStateFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A user in a resolved lifecycle state.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use warden_events::MemoryEventBus;
/// use warden_lifecycle::{StateKind, User, UserStateFactory};
///
/// # async fn example() -> warden_lifecycle::LifecycleResult<()> {
/// let factory = UserStateFactory::new(Arc::new(MemoryEventBus::new()));
/// let state = factory.resolve(User::new("accounts", "bob"));
///
/// let state = state.detain(7).await?;
/// assert_eq!(state.kind(), StateKind::Detained);
///
/// let state = state.release().await?;
/// assert_eq!(state.kind(), StateKind::Active);
/// # Ok(())
/// # }
/// ```
pub struct UserState {
    kind: StateKind,
    user: User,
    events: Arc<dyn EventBus>,
    config: LifecycleConfig,
}

impl UserState {
    /// The resolved state.
    pub fn kind(&self) -> StateKind {
        self.kind
    }

    /// The wrapped user.
    pub fn user(&self) -> &User {
        &self.user
    }

    pub(crate) fn user_mut(&mut self) -> &mut User {
        &mut self.user
    }

    /// Unwrap the user for persisting.
    pub fn into_user(self) -> User {
        self.user
    }

    /// Detain for `days` days from now.
    pub async fn detain(self, days: i64) -> LifecycleResult<Self> {
        self.apply(Operation::Detain { days }).await
    }

    /// Ban permanently.
    pub async fn ban(self) -> LifecycleResult<Self> {
        self.apply(Operation::Ban { until: None }).await
    }

    /// Ban until `until`, which must be in the future.
    pub async fn ban_until(self, until: DateTime<Utc>) -> LifecycleResult<Self> {
        self.apply(Operation::Ban { until: Some(until) }).await
    }

    /// Lift detention or ban.
    pub async fn release(self) -> LifecycleResult<Self> {
        self.apply(Operation::Release).await
    }

    /// Soft-delete.
    pub async fn delete(self) -> LifecycleResult<Self> {
        self.apply(Operation::Delete).await
    }

    /// Revert a soft deletion.
    pub async fn activate(self) -> LifecycleResult<Self> {
        self.apply(Operation::Activate).await
    }

    /// Remove the user. `delete` purges data; otherwise it is anonymized.
    pub async fn remove(self, delete: bool) -> LifecycleResult<Self> {
        self.apply(Operation::Remove { delete }).await
    }

    /// File an arbitration petition.
    pub async fn petition(self, petition_id: Uuid) -> LifecycleResult<Self> {
        self.apply(Operation::Petition { petition_id }).await
    }

    /// Apply an operation now.
    pub async fn apply(self, op: Operation) -> LifecycleResult<Self> {
        self.apply_at(op, Utc::now()).await
    }

    /// Apply an operation as of `now`.
    pub async fn apply_at(mut self, op: Operation, now: DateTime<Utc>) -> LifecycleResult<Self> {
        let from = self.kind;
        let outcome = transition(from, op, &mut self.user, now, &self.config)?;
        self.kind = outcome.to;

        if let Some(user_event) = outcome.event {
            let event = user_event
                .to_event()?
                .with_namespace(self.user.meta.namespace.clone());
            self.events.publish(event).await?;

            tracing::info!(
                user_id = %self.user.uid(),
                user = %self.user.meta.key(),
                operation = op.name(),
                from = %from,
                to = %self.kind,
                "User transition"
            );
        }

        Ok(self)
    }
}

impl fmt::Debug for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserState")
            .field("kind", &self.kind)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
