use chrono::{DateTime, SecondsFormat, Utc};
use console_policy::ConditionContext;

use crate::{ClaimValue, Claims, Principal, Settings};

/// Principal type reported for console requests; the console only ever holds
/// temporary credentials.
pub const ASSUMED_ROLE_PRINCIPAL_TYPE: &str = "AssumeRole";

/// Signature version of every request the console signs.
pub const SIGNATURE_VERSION: &str = "AWS4-HMAC-SHA256";

/// Authentication style of every request the console signs.
pub const AUTH_TYPE: &str = "REST-HEADER";

/// Condition key names populated by [`ConditionValues`].
pub mod keys {
    /// Caller identity.
    pub const USERNAME: &str = "username";
    /// Principal type.
    pub const PRINCIPAL_TYPE: &str = "principaltype";
    /// Whether the storage endpoint uses TLS.
    pub const SECURE_TRANSPORT: &str = "SecureTransport";
    /// Request time as RFC 3339.
    pub const CURRENT_TIME: &str = "CurrentTime";
    /// Request time as Unix seconds.
    pub const EPOCH_TIME: &str = "EpochTime";
    /// Request signature version.
    pub const SIGNATURE_VERSION: &str = "signatureversion";
    /// Request authentication style.
    pub const AUTH_TYPE: &str = "authType";
    /// Deployment region.
    pub const LOCATION_CONSTRAINT: &str = "LocationConstraint";
}

/// Builds the condition context used to evaluate a session's policy.
///
/// The context holds request facts the console can vouch for (identity,
/// transport, time, signing method, region) followed by every plain-string
/// claim of the session token under its own name. A claim that shares a name
/// with a request fact replaces it.
#[derive(Debug, Clone)]
pub struct ConditionValues<'a> {
    principal: &'a Principal,
    settings: &'a Settings,
    claims: &'a Claims,
    now: DateTime<Utc>,
}

impl<'a> ConditionValues<'a> {
    /// Prepare a builder for `principal` at time `now`.
    pub fn new(
        principal: &'a Principal,
        settings: &'a Settings,
        claims: &'a Claims,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            principal,
            settings,
            claims,
            now,
        }
    }

    /// Produce the condition context.
    pub fn build(&self) -> ConditionContext {
        let mut context = ConditionContext::new();
        let mut set = |key: &str, value: String| {
            context.insert(key.to_string(), vec![value]);
        };

        set(keys::USERNAME, self.principal.account_access_key.clone());
        set(keys::PRINCIPAL_TYPE, ASSUMED_ROLE_PRINCIPAL_TYPE.to_string());
        set(keys::SECURE_TRANSPORT, self.settings.is_secure().to_string());
        set(
            keys::CURRENT_TIME,
            self.now.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        set(keys::EPOCH_TIME, self.now.timestamp().to_string());
        set(keys::SIGNATURE_VERSION, SIGNATURE_VERSION.to_string());
        set(keys::AUTH_TYPE, AUTH_TYPE.to_string());
        set(keys::LOCATION_CONSTRAINT, self.settings.region.clone());

        for (name, value) in self.claims.iter() {
            if let ClaimValue::String(value) = value {
                set(name.as_str(), value.clone());
            }
        }

        context
    }
}
