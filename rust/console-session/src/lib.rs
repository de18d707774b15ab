#![warn(missing_docs)]

//! Session permission resolution for the object storage console.
//!
//! On every session check the console turns the authenticated
//! [`Principal`] and the account's raw policy into the permission table the
//! UI renders from:
//!
//! 1. [`replace_policy_variables`] substitutes identity placeholders such as
//!    `${aws:username}` and `${jwt:email}`.
//! 2. A [`console_policy::PolicyParser`] parses the result.
//! 3. [`ConditionValues`] builds the condition context from request facts and
//!    token [`Claims`].
//! 4. [`aggregate`] folds the statements into a [`PermissionMap`] and the
//!    list of conditioned grants ([`AllowResource`]).
//! 5. [`SessionResponse`] packages the result with the enabled features.
//!
//! [`check_session`] runs the whole pipeline against an [`AdminClient`].
//!
//! ```
//! use console_policy::{ConditionContext, JsonPolicyParser, PolicyParser};
//! use console_session::{Claims, aggregate, replace_policy_variables};
//!
//! let raw = br#"{
//!     "Statement": [
//!         { "Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": ["${aws:username}"] },
//!         { "Effect": "Deny", "Action": ["s3:PutObject"], "Resource": ["${aws:username}"] }
//!     ]
//! }"#;
//!
//! let policy = JsonPolicyParser
//!     .parse(&replace_policy_variables(raw, "alice", &Claims::new()))
//!     .unwrap();
//! let resolution = aggregate(&policy, &ConditionContext::new()).unwrap();
//!
//! assert_eq!(resolution.permissions["alice"].to_strings(), vec!["s3:GetObject"]);
//! ```

mod error;
pub use error::*;

mod claims;
pub use claims::*;

mod principal;
pub use principal::*;

mod settings;
pub use settings::*;

mod variables;
pub use variables::*;

mod conditions;
pub use conditions::*;

mod allow;
pub use allow::*;

mod aggregate;
pub use aggregate::*;

mod admin;
pub use admin::*;

mod response;
pub use response::*;

mod session;
pub use session::*;
