//! # Policy Tuples
//!
//! A policy tuple grants a role a set of actions on a target type, under an
//! ownership condition. Tuples arrive pre-parsed from the policy source;
//! only the owner selector has a string form that is parsed here.
//!
//! ```text
//! (target_type, actions, owner_selector, required_role)
//!
//! Examples:
//!   ("TestObject", {update, delete}, owned, ADMIN)
//!   ("*",          {*},              *,     SUPERUSER)
//!   ("User",       {read},           self,  USER)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{PolicyError, PolicyResult};

/// Wildcard accepted for target types, actions and owner selectors.
pub const WILDCARD: &str = "*";

/// Ownership condition of a policy tuple.
///
/// `Owned` and `SelfOwned` evaluate identically (the target's owner must be
/// the subject); both keywords exist so policy files read naturally.
///
/// # Example
///
/// ```
/// use warden_abac::OwnerSelector;
///
/// let selector = OwnerSelector::parse("owned:author").unwrap();
/// assert_eq!(selector.to_string(), "owned:author");
/// assert!(selector.matches("mary", "mary"));
/// assert!(!selector.matches("andrew", "mary"));
/// assert!(OwnerSelector::parse("everyone").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OwnerSelector {
    /// `*`: any ownership
    Any,
    /// `self`: the subject is the target's owner
    SelfOwned,
    /// `owned` or `owned:<relation>`: the target is owned by the subject
    Owned {
        /// Named ownership relation, kept for readability
        relation: Option<String>,
    },
}

impl OwnerSelector {
    /// Parse a selector string.
    ///
    /// # Returns
    ///
    /// `Err(PolicyError::InvalidSelector)` for anything other than `*`,
    /// `self`, `owned` or `owned:<relation>`.
    pub fn parse(s: &str) -> PolicyResult<Self> {
        let s = s.trim();
        match s {
            WILDCARD => Ok(Self::Any),
            "self" => Ok(Self::SelfOwned),
            "owned" => Ok(Self::Owned { relation: None }),
            _ => match s.split_once(':') {
                Some(("owned", relation)) if !relation.trim().is_empty() => Ok(Self::Owned {
                    relation: Some(relation.trim().to_string()),
                }),
                _ => Err(PolicyError::InvalidSelector(s.to_string())),
            },
        }
    }

    /// Check the ownership condition.
    ///
    /// # Arguments
    ///
    /// * `subject_id` - Identifier of the acting subject
    /// * `owner_id` - Owner identifier declared by the target
    pub fn matches(&self, subject_id: &str, owner_id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::SelfOwned | Self::Owned { .. } => owner_id == subject_id,
        }
    }
}

impl fmt::Display for OwnerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::SelfOwned => f.write_str("self"),
            Self::Owned { relation: None } => f.write_str("owned"),
            Self::Owned {
                relation: Some(relation),
            } => write!(f, "owned:{}", relation),
        }
    }
}

impl TryFrom<String> for OwnerSelector {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerSelector> for String {
    fn from(selector: OwnerSelector) -> Self {
        selector.to_string()
    }
}

/// A single pre-parsed policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTuple {
    /// Target type name, or `*`
    pub target_type: String,
    /// Permitted actions; may contain `*`
    pub actions: BTreeSet<String>,
    /// Ownership condition
    pub owner_selector: OwnerSelector,
    /// Role the subject must hold (without prefix)
    pub required_role: String,
}

impl PolicyTuple {
    /// Create a tuple from already-typed parts.
    pub fn new<I, S>(
        target_type: impl Into<String>,
        actions: I,
        owner_selector: OwnerSelector,
        required_role: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_type: target_type.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            owner_selector,
            required_role: required_role.into(),
        }
    }

    /// Create a tuple from string parts, validating each.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_abac::PolicyTuple;
    ///
    /// let tuple = PolicyTuple::parse("TestObject", ["update", "delete"], "owned", "ADMIN").unwrap();
    /// assert!(tuple.permits_action("update"));
    /// assert!(!tuple.permits_action("remove"));
    /// ```
    pub fn parse<I, S>(
        target_type: &str,
        actions: I,
        owner_selector: &str,
        required_role: &str,
    ) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if target_type.trim().is_empty() {
            return Err(PolicyError::InvalidTuple("target type is empty".to_string()));
        }
        if required_role.trim().is_empty() {
            return Err(PolicyError::InvalidTuple("required role is empty".to_string()));
        }
        let tuple = Self::new(
            target_type.trim(),
            actions,
            OwnerSelector::parse(owner_selector)?,
            required_role.trim(),
        );
        if tuple.actions.is_empty() {
            return Err(PolicyError::InvalidTuple("action set is empty".to_string()));
        }
        Ok(tuple)
    }

    /// Check the target type (exact, or wildcard).
    pub fn matches_target_type(&self, type_name: &str) -> bool {
        self.target_type == WILDCARD || self.target_type == type_name
    }

    /// Check the action (member of the set, or the set holds the wildcard).
    pub fn permits_action(&self, action: &str) -> bool {
        self.actions.contains(action) || self.actions.contains(WILDCARD)
    }
}

/// An immutable collection of tuples, cached by the caller across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicySet {
    tuples: Vec<PolicyTuple>,
}

impl PolicySet {
    /// Create a policy set.
    pub fn new(tuples: Vec<PolicyTuple>) -> Self {
        Self { tuples }
    }

    /// The tuples, in source order.
    pub fn tuples(&self) -> &[PolicyTuple] {
        &self.tuples
    }

    /// Tuples requiring the given role.
    pub fn for_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a PolicyTuple> + 'a {
        self.tuples.iter().filter(move |t| t.required_role == role)
    }

    /// Number of tuples.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

impl FromIterator<PolicyTuple> for PolicySet {
    fn from_iter<T: IntoIterator<Item = PolicyTuple>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parsing() {
        assert_eq!(OwnerSelector::parse("*").unwrap(), OwnerSelector::Any);
        assert_eq!(OwnerSelector::parse("self").unwrap(), OwnerSelector::SelfOwned);
        assert_eq!(
            OwnerSelector::parse("owned").unwrap(),
            OwnerSelector::Owned { relation: None }
        );
        assert_eq!(
            OwnerSelector::parse(" owned:author ").unwrap(),
            OwnerSelector::Owned {
                relation: Some("author".to_string())
            }
        );

        assert!(OwnerSelector::parse("owned:").is_err());
        assert!(OwnerSelector::parse("shared:team").is_err());
        assert_eq!(
            OwnerSelector::parse("").unwrap_err(),
            PolicyError::InvalidSelector(String::new())
        );
    }

    #[test]
    fn test_selector_display_roundtrip() {
        for s in ["*", "self", "owned", "owned:author"] {
            assert_eq!(OwnerSelector::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_owned_and_self_evaluate_identically() {
        let owned = OwnerSelector::parse("owned:creator").unwrap();
        let own = OwnerSelector::SelfOwned;
        for (subject, owner) in [("mary", "mary"), ("andrew", "mary")] {
            assert_eq!(owned.matches(subject, owner), own.matches(subject, owner));
        }
        assert!(OwnerSelector::Any.matches("andrew", "mary"));
    }

    #[test]
    fn test_tuple_parse_validation() {
        assert!(PolicyTuple::parse("", ["read"], "*", "ADMIN").is_err());
        assert!(PolicyTuple::parse("Doc", ["read"], "*", " ").is_err());
        assert!(PolicyTuple::parse("Doc", Vec::<String>::new(), "*", "ADMIN").is_err());
        assert!(matches!(
            PolicyTuple::parse("Doc", ["read"], "group", "ADMIN"),
            Err(PolicyError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_tuple_matching() {
        let tuple = PolicyTuple::new("TestObject", ["update", "delete"], OwnerSelector::Any, "ADMIN");
        assert!(tuple.matches_target_type("TestObject"));
        assert!(!tuple.matches_target_type("Other"));
        assert!(tuple.permits_action("delete"));
        assert!(!tuple.permits_action("remove"));

        let wildcard = PolicyTuple::new("*", ["*"], OwnerSelector::Any, "ADMIN");
        assert!(wildcard.matches_target_type("Anything"));
        assert!(wildcard.permits_action("remove"));
    }

    #[test]
    fn test_tuple_deserialization() {
        let json = serde_json::json!([
            {
                "target_type": "TestObject",
                "actions": ["update", "delete"],
                "owner_selector": "owned:author",
                "required_role": "ADMIN"
            },
            {
                "target_type": "*",
                "actions": ["*"],
                "owner_selector": "*",
                "required_role": "SUPERUSER"
            }
        ]);

        let set: PolicySet = serde_json::from_value(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.tuples()[0].owner_selector,
            OwnerSelector::Owned {
                relation: Some("author".to_string())
            }
        );
        assert_eq!(set.for_role("SUPERUSER").count(), 1);

        let bad = serde_json::json!({
            "target_type": "TestObject",
            "actions": ["read"],
            "owner_selector": "friends",
            "required_role": "ADMIN"
        });
        assert!(serde_json::from_value::<PolicyTuple>(bad).is_err());
    }
}
