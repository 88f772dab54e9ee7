//! User domain model
//!
//! A user is a stored resource whose activity is described by independent
//! ban, detention and deletion markers. The markers may overlap; the state
//! machine resolves them into one current state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use warden_abac::{HasOwner, Subject, DEFAULT_ROLE_PREFIX};
use warden_store::{ObjectMeta, Resource};

/// Type name users are matched under in policy tuples.
pub const USER_TYPE_NAME: &str = "User";

/// User account.
///
/// # Examples
///
/// ```
/// use warden_lifecycle::User;
///
/// let user = User::new("accounts", "bob")
///     .with_email("bob@example.com")
///     .with_role("USER");
/// assert!(user.is_active());
/// assert!(user.roles.contains("USER"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Resource metadata (uid, key, generation)
    pub meta: ObjectMeta,

    /// Contact email
    pub email: Option<String>,

    /// Display name
    pub display_name: Option<String>,

    /// Role identifiers, without grant prefix
    #[serde(default)]
    pub roles: BTreeSet<String>,

    /// Permanent ban marker
    #[serde(default)]
    pub banned_forever: bool,

    /// End of a time-limited ban
    pub banned_until: Option<DateTime<Utc>>,

    /// End of detention
    pub detained_until: Option<DateTime<Utc>>,

    /// Soft deletion timestamp
    pub deleted_at: Option<DateTime<Utc>>,

    /// Removal timestamp; a removed user accepts no further transitions
    pub removed_at: Option<DateTime<Utc>>,

    /// Arbitration petitions filed against this user
    #[serde(default)]
    pub petitions: Vec<Uuid>,
}

impl User {
    /// Create an active user with fresh metadata.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_meta(ObjectMeta::new(namespace, name))
    }

    /// Create an active user around existing metadata.
    pub fn from_meta(meta: ObjectMeta) -> Self {
        Self {
            meta,
            email: None,
            display_name: None,
            roles: BTreeSet::new(),
            banned_forever: false,
            banned_until: None,
            detained_until: None,
            deleted_at: None,
            removed_at: None,
            petitions: Vec::new(),
        }
    }

    /// Set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// The user's uid.
    pub fn uid(&self) -> Uuid {
        self.meta.uid
    }

    /// Check if banned at `now` (permanently, or until a later instant).
    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.banned_forever || self.banned_until.map(|until| now < until).unwrap_or(false)
    }

    /// Check if detained at `now`.
    pub fn is_detained_at(&self, now: DateTime<Utc>) -> bool {
        self.detained_until.map(|until| now < until).unwrap_or(false)
    }

    /// Check if soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check if removed.
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    /// Check if active at `now`: not banned, detained, or deleted.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_banned_at(now) && !self.is_detained_at(now) && !self.is_deleted()
    }

    /// Check if inactive at `now`.
    pub fn is_inactive_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_active_at(now)
    }

    /// Check if banned now.
    pub fn is_banned(&self) -> bool {
        self.is_banned_at(Utc::now())
    }

    /// Check if detained now.
    pub fn is_detained(&self) -> bool {
        self.is_detained_at(Utc::now())
    }

    /// Check if active now.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Check if inactive now.
    pub fn is_inactive(&self) -> bool {
        !self.is_active()
    }

    /// Drop personal data, keeping the account record.
    pub fn anonymize(&mut self) {
        self.email = None;
        self.display_name = None;
    }

    /// Policy subject for this user, roles granted under `prefix`.
    pub fn to_subject_with_prefix(&self, prefix: &str) -> Subject {
        Subject::new(self.uid().to_string())
            .with_prefixed_roles(prefix, self.roles.iter().map(String::as_str))
    }

    /// Policy subject for this user, roles granted under the default prefix.
    pub fn to_subject(&self) -> Subject {
        self.to_subject_with_prefix(DEFAULT_ROLE_PREFIX)
    }
}

impl Resource for User {
    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

impl HasOwner for User {
    fn object_id(&self) -> String {
        self.uid().to_string()
    }

    // A user account is owned by the user it describes
    fn owner_id(&self) -> String {
        self.uid().to_string()
    }

    fn type_name(&self) -> &str {
        USER_TYPE_NAME
    }
}
