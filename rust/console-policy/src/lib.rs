#![warn(missing_docs)]

//! IAM-style policy documents.
//!
//! This crate models the policy documents an object storage cluster attaches
//! to an account and answers the questions the console asks of them:
//!
//! - [`PolicyParser`] / [`JsonPolicyParser`] turn raw bytes into a [`Policy`],
//!   an ordered list of [`Statement`]s.
//! - [`ConditionSet`] decodes a statement's `Condition` element into
//!   operator → key → values and evaluates it against a
//!   [`ConditionContext`].
//! - [`Policy::allowed_actions`] expands every action in the catalog
//!   ([`ActionSet::catalog`]) against a resource and returns what is allowed,
//!   with explicit Deny overriding Allow.
//!
//! ```
//! use console_policy::{ConditionContext, JsonPolicyParser, PolicyParser};
//!
//! let policy = JsonPolicyParser.parse(br#"{
//!     "Version": "2012-10-17",
//!     "Statement": [
//!         { "Effect": "Allow", "Action": ["admin:*"] },
//!         { "Effect": "Deny", "Action": ["admin:ServiceStop"] }
//!     ]
//! }"#).unwrap();
//!
//! let allowed = policy.allowed_actions("", &ConditionContext::new()).unwrap();
//! assert!(allowed.contains("admin:ServerInfo"));
//! assert!(!allowed.contains("admin:ServiceStop"));
//! ```

mod error;
pub use error::*;

pub mod wildcard;

mod action;
pub use action::*;

mod condition;
pub use condition::*;

mod statement;
pub use statement::*;

mod policy;
pub use policy::*;

mod parser;
pub use parser::*;
