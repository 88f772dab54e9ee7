//! # Warden ABAC (Attribute-Based Access Control)
//!
//! This crate decides whether a subject may perform an action on a target,
//! based on the subject's role grants and the target's declared owner.
//!
//! ## Overview
//!
//! The warden-abac crate handles:
//! - **Subjects**: The acting identity and its granted authorities
//! - **Targets**: Anything implementing [`HasOwner`]
//! - **Policy Tuples**: Target type + actions + owner selector + required role
//! - **Engine**: The four-step decision procedure
//!
//! ## Architecture
//!
//! ```text
//! enforce(subject, target, action, tuple)
//!   1. subject holds ROLE_<required_role>
//!   2. tuple.target_type == target.type_name() or "*"
//!   3. owner selector: "*" | owned[:relation] | self
//!   4. action in tuple.actions or "*" in tuple.actions
//! ```
//!
//! A denial is a plain `false`, never an error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_abac::{OwnershipPolicyEngine, PolicySet, PolicyTuple, Subject};
//!
//! // Cache the policy set once, evaluate per request
//! let policies: PolicySet = vec![
//!     PolicyTuple::parse("Document", ["update", "delete"], "owned", "EDITOR").unwrap(),
//!     PolicyTuple::parse("*", ["*"], "*", "ADMIN").unwrap(),
//! ]
//! .into_iter()
//! .collect();
//!
//! let engine = OwnershipPolicyEngine::new();
//! let subject = Subject::new("mary").with_role("EDITOR");
//! # struct Document;
//! # impl warden_abac::HasOwner for Document {
//! #     fn object_id(&self) -> String { "doc-1".into() }
//! #     fn owner_id(&self) -> String { "mary".into() }
//! #     fn type_name(&self) -> &str { "Document" }
//! # }
//! let allowed = engine.enforce_any(&subject, &Document, "update", policies.tuples());
//! assert!(allowed);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod policy;
pub mod subject;

// Re-export main types for convenience
pub use config::{AbacConfig, ConfigError};
pub use engine::{Decision, DenyReason, OwnershipPolicyEngine};
pub use error::{PolicyError, PolicyResult};
pub use policy::{OwnerSelector, PolicySet, PolicyTuple, WILDCARD};
pub use subject::{HasOwner, Subject, DEFAULT_ROLE_PREFIX};
