//! # Ownership Policy Engine
//!
//! Decides whether a subject may perform an action on a target under a
//! policy tuple. Four checks run in order and the first failure denies:
//!
//! 1. **Role**: the subject holds `<prefix><required_role>`
//! 2. **Target type**: the tuple names the target's type, or `*`
//! 3. **Ownership**: the owner selector matches
//! 4. **Action**: the tuple's action set holds the action, or `*`
//!
//! The engine keeps no state between calls and never caches.

use crate::config::AbacConfig;
use crate::policy::{PolicySet, PolicyTuple};
use crate::subject::{HasOwner, Subject};

/// The check that denied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Subject lacks the required role
    MissingRole,
    /// Tuple is for another target type
    TargetTypeMismatch,
    /// Ownership condition failed
    NotOwner,
    /// Action not in the tuple's action set
    ActionNotPermitted,
}

/// Outcome of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// All four checks passed
    Allow,
    /// A check failed
    Deny(DenyReason),
}

impl Decision {
    /// Check if the decision allows the request.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Ownership-based policy engine.
///
/// # Example
///
/// ```
/// use warden_abac::{HasOwner, OwnershipPolicyEngine, PolicyTuple, Subject};
///
/// struct Note {
///     id: String,
///     owner: String,
/// }
///
/// impl HasOwner for Note {
///     fn object_id(&self) -> String { self.id.clone() }
///     fn owner_id(&self) -> String { self.owner.clone() }
///     fn type_name(&self) -> &str { "Note" }
/// }
///
/// let engine = OwnershipPolicyEngine::new();
/// let tuple = PolicyTuple::parse("Note", ["update"], "owned", "USER").unwrap();
/// let note = Note { id: "n1".into(), owner: "mary".into() };
///
/// let mary = Subject::new("mary").with_role("USER");
/// let andrew = Subject::new("andrew").with_role("USER");
/// assert!(engine.enforce(&mary, &note, "update", &tuple));
/// assert!(!engine.enforce(&andrew, &note, "update", &tuple));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OwnershipPolicyEngine {
    config: AbacConfig,
}

impl OwnershipPolicyEngine {
    /// Create an engine with the default role prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine from configuration.
    pub fn with_config(config: AbacConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &AbacConfig {
        &self.config
    }

    /// Evaluate one tuple, reporting which check failed.
    pub fn evaluate<T>(
        &self,
        subject: &Subject,
        target: &T,
        action: &str,
        tuple: &PolicyTuple,
    ) -> Decision
    where
        T: HasOwner + ?Sized,
    {
        if !subject.has_grant(&self.config.grant_for(&tuple.required_role)) {
            return Decision::Deny(DenyReason::MissingRole);
        }

        if !tuple.matches_target_type(target.type_name()) {
            return Decision::Deny(DenyReason::TargetTypeMismatch);
        }

        if !tuple
            .owner_selector
            .matches(&subject.id, &target.owner_id())
        {
            return Decision::Deny(DenyReason::NotOwner);
        }

        if !tuple.permits_action(action) {
            return Decision::Deny(DenyReason::ActionNotPermitted);
        }

        Decision::Allow
    }

    /// Decide one tuple.
    pub fn enforce<T>(&self, subject: &Subject, target: &T, action: &str, tuple: &PolicyTuple) -> bool
    where
        T: HasOwner + ?Sized,
    {
        let decision = self.evaluate(subject, target, action, tuple);
        if let Decision::Deny(reason) = decision {
            tracing::debug!(
                subject = %subject.id,
                target_type = target.type_name(),
                target_id = %target.object_id(),
                action,
                required_role = %tuple.required_role,
                ?reason,
                "Policy tuple denied"
            );
        }
        decision.is_allowed()
    }

    /// Decide against several tuples: allowed if any tuple allows.
    pub fn enforce_any<T>(
        &self,
        subject: &Subject,
        target: &T,
        action: &str,
        tuples: &[PolicyTuple],
    ) -> bool
    where
        T: HasOwner + ?Sized,
    {
        tuples
            .iter()
            .any(|tuple| self.evaluate(subject, target, action, tuple).is_allowed())
    }
}

impl PolicySet {
    /// Decide against every tuple in the set.
    pub fn allows<T>(
        &self,
        engine: &OwnershipPolicyEngine,
        subject: &Subject,
        target: &T,
        action: &str,
    ) -> bool
    where
        T: HasOwner + ?Sized,
    {
        engine.enforce_any(subject, target, action, self.tuples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::OwnerSelector;

    struct TestObject {
        id: String,
        owner: String,
    }

    impl TestObject {
        fn owned_by(owner: &str) -> Self {
            Self {
                id: format!("{}-object", owner),
                owner: owner.to_string(),
            }
        }
    }

    impl HasOwner for TestObject {
        fn object_id(&self) -> String {
            self.id.clone()
        }

        fn owner_id(&self) -> String {
            self.owner.clone()
        }

        fn type_name(&self) -> &str {
            "TestObject"
        }
    }

    fn admin_update_delete(selector: &str) -> PolicyTuple {
        PolicyTuple::parse("TestObject", ["update", "delete"], selector, "ADMIN").unwrap()
    }

    #[test]
    fn test_owner_allowed_update() {
        let engine = OwnershipPolicyEngine::new();
        let mary = Subject::new("mary").with_role("ADMIN");
        let marys_object = TestObject::owned_by("mary");

        for selector in ["owned", "owned:owner", "self"] {
            assert!(engine.enforce(&mary, &marys_object, "update", &admin_update_delete(selector)));
        }
    }

    #[test]
    fn test_non_owner_denied() {
        let engine = OwnershipPolicyEngine::new();
        let andrew = Subject::new("andrew").with_role("ADMIN");
        let marys_object = TestObject::owned_by("mary");

        let tuple = admin_update_delete("owned");
        assert!(!engine.enforce(&andrew, &marys_object, "update", &tuple));
        assert_eq!(
            engine.evaluate(&andrew, &marys_object, "update", &tuple),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_action_outside_set_denied() {
        let engine = OwnershipPolicyEngine::new();
        let mary = Subject::new("mary").with_role("ADMIN");
        let marys_object = TestObject::owned_by("mary");
        let tuple = admin_update_delete("owned");

        assert!(engine.enforce(&mary, &marys_object, "update", &tuple));
        assert_eq!(
            engine.evaluate(&mary, &marys_object, "remove", &tuple),
            Decision::Deny(DenyReason::ActionNotPermitted)
        );

        // A wildcard tuple grants what the first one does not
        let wildcard = PolicyTuple::new("TestObject", ["*"], OwnerSelector::SelfOwned, "ADMIN");
        let tuples = vec![tuple, wildcard];
        assert!(engine.enforce_any(&mary, &marys_object, "remove", &tuples));
    }

    #[test]
    fn test_missing_role_denied_even_for_owner() {
        let engine = OwnershipPolicyEngine::new();
        let mary = Subject::new("mary").with_role("USER");
        let marys_object = TestObject::owned_by("mary");

        let tuple = PolicyTuple::new("*", ["*"], OwnerSelector::Any, "ADMIN");
        assert_eq!(
            engine.evaluate(&mary, &marys_object, "update", &tuple),
            Decision::Deny(DenyReason::MissingRole)
        );

        // Role name without prefix is not a grant
        let unprefixed = Subject::new("mary").with_grant("ADMIN");
        assert!(!engine.enforce(&unprefixed, &marys_object, "update", &tuple));
    }

    #[test]
    fn test_target_type_mismatch() {
        let engine = OwnershipPolicyEngine::new();
        let mary = Subject::new("mary").with_role("ADMIN");
        let marys_object = TestObject::owned_by("mary");

        let tuple = PolicyTuple::parse("Invoice", ["*"], "*", "ADMIN").unwrap();
        assert_eq!(
            engine.evaluate(&mary, &marys_object, "read", &tuple),
            Decision::Deny(DenyReason::TargetTypeMismatch)
        );
    }

    #[test]
    fn test_wildcard_owner_allows_anyone_with_role() {
        let engine = OwnershipPolicyEngine::new();
        let andrew = Subject::new("andrew").with_role("ADMIN");
        let marys_object = TestObject::owned_by("mary");

        let tuple = PolicyTuple::parse("*", ["update"], "*", "ADMIN").unwrap();
        assert!(engine.enforce(&andrew, &marys_object, "update", &tuple));
    }

    #[test]
    fn test_custom_role_prefix() {
        let engine = OwnershipPolicyEngine::with_config(AbacConfig {
            role_prefix: "GROUP_".to_string(),
        });
        let marys_object = TestObject::owned_by("mary");
        let tuple = admin_update_delete("owned");

        let prefixed = Subject::new("mary").with_prefixed_roles("GROUP_", ["ADMIN"]);
        assert!(engine.enforce(&prefixed, &marys_object, "delete", &tuple));

        let default_prefixed = Subject::new("mary").with_role("ADMIN");
        assert!(!engine.enforce(&default_prefixed, &marys_object, "delete", &tuple));
    }

    #[test]
    fn test_enforce_any_with_policy_set() {
        let engine = OwnershipPolicyEngine::new();
        let set: PolicySet = vec![
            admin_update_delete("owned"),
            PolicyTuple::parse("TestObject", ["read"], "*", "USER").unwrap(),
        ]
        .into_iter()
        .collect();

        let andrew = Subject::new("andrew").with_role("USER");
        let marys_object = TestObject::owned_by("mary");

        assert!(engine.enforce_any(&andrew, &marys_object, "read", set.tuples()));
        assert!(!engine.enforce_any(&andrew, &marys_object, "update", set.tuples()));
        assert!(!engine.enforce_any(&andrew, &marys_object, "read", &[]));
        assert!(set.allows(&engine, &andrew, &marys_object, "read"));
        assert!(!PolicySet::default().allows(&engine, &andrew, &marys_object, "read"));
    }

    #[test]
    fn test_dyn_target() {
        let engine = OwnershipPolicyEngine::new();
        let mary = Subject::new("mary").with_role("ADMIN");
        let target: Box<dyn HasOwner> = Box::new(TestObject::owned_by("mary"));

        assert!(engine.enforce(&mary, target.as_ref(), "delete", &admin_update_delete("self")));
    }
}
