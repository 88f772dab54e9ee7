//! # Subjects and Targets
//!
//! The two sides of an authorization decision: the acting [`Subject`]
//! with its role grants, and any target implementing [`HasOwner`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Prefix turning a role name into a grant (`ADMIN` is held as `ROLE_ADMIN`).
pub const DEFAULT_ROLE_PREFIX: &str = "ROLE_";

/// The authenticated actor of a request.
///
/// Built by the caller from whatever identity provider it uses; grants are
/// held verbatim, so a role `ADMIN` must be present as `ROLE_ADMIN`.
///
/// # Example
///
/// ```
/// use warden_abac::Subject;
///
/// let mary = Subject::new("mary").with_role("ADMIN");
/// assert!(mary.has_grant("ROLE_ADMIN"));
/// assert!(!mary.has_grant("ADMIN"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    /// Subject identifier, compared against target owner ids.
    pub id: String,
    /// Granted authorities (prefixed role names).
    #[serde(default)]
    pub grants: BTreeSet<String>,
}

impl Subject {
    /// Create a subject without grants.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            grants: BTreeSet::new(),
        }
    }

    /// Add a raw grant.
    pub fn with_grant(mut self, grant: impl Into<String>) -> Self {
        self.grants.insert(grant.into());
        self
    }

    /// Add a role, stored under [`DEFAULT_ROLE_PREFIX`].
    pub fn with_role(self, role: &str) -> Self {
        self.with_grant(format!("{}{}", DEFAULT_ROLE_PREFIX, role))
    }

    /// Add several roles with an explicit prefix.
    pub fn with_prefixed_roles<'a, I>(mut self, prefix: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for role in roles {
            self.grants.insert(format!("{}{}", prefix, role));
        }
        self
    }

    /// Check for an exact grant.
    pub fn has_grant(&self, grant: &str) -> bool {
        self.grants.contains(grant)
    }
}

/// A target that can be checked for ownership.
pub trait HasOwner {
    /// Identifier of the target itself.
    fn object_id(&self) -> String;

    /// Identifier of the target's owner.
    fn owner_id(&self) -> String;

    /// Type name matched against a policy tuple's target type.
    fn type_name(&self) -> &str;
}
