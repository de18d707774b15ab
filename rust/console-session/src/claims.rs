//! Session token claims.
//!
//! The console never verifies the session token signature itself: the
//! storage backend issued it and re-checks it on every call. Here the payload
//! is only decoded so that identity attributes can be used for policy
//! variables and condition values.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Claim carrying the directory user DN for `${ldap:user}`.
pub const LDAP_USER_CLAIM: &str = "ldapUser";

/// Claim carrying the directory username for `${ldap:username}`.
pub const LDAP_USERNAME_CLAIM: &str = "ldapUsername";

/// Errors decoding a session token payload.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token does not have the `header.payload.signature` shape.
    #[error("Malformed token: expected three dot-separated segments")]
    MalformedToken,

    /// The payload segment is not valid base64url.
    #[error("Invalid token payload encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload is not valid JSON.
    #[error("Invalid token payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("Token payload is not a JSON object")]
    NotAnObject,
}

/// Value of a single claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ClaimValue {
    /// A plain string claim such as `sub` or `email`.
    String(String),
    /// A multi-valued claim such as `groups`.
    StringArray(Vec<String>),
    /// Any other JSON value (numbers, booleans, objects, mixed arrays).
    Other(Value),
}

impl ClaimValue {
    /// The string value, if this is a plain string claim.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Default textual rendering used when the claim is spliced into a
    /// policy document: strings verbatim, string arrays as `[a b c]`, and
    /// anything else as its JSON text with surrounding quotes removed.
    pub fn to_variable_string(&self) -> String {
        match self {
            ClaimValue::String(value) => value.clone(),
            ClaimValue::StringArray(values) => format!("[{}]", values.join(" ")),
            ClaimValue::Other(value) => value.to_string().trim_matches('"').to_string(),
        }
    }
}

impl From<Value> for ClaimValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(value) => ClaimValue::String(value),
            Value::Array(items) if items.iter().all(Value::is_string) => ClaimValue::StringArray(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(value) => Some(value),
                        _ => None,
                    })
                    .collect(),
            ),
            other => ClaimValue::Other(other),
        }
    }
}

impl From<ClaimValue> for Value {
    fn from(value: ClaimValue) -> Self {
        match value {
            ClaimValue::String(value) => Value::String(value),
            ClaimValue::StringArray(values) => {
                Value::Array(values.into_iter().map(Value::String).collect())
            }
            ClaimValue::Other(value) => value,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::String(value)
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(values: Vec<String>) -> Self {
        ClaimValue::StringArray(values)
    }
}

/// Claim name → value, built once per request from the session token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, ClaimValue>);

impl Claims {
    /// Create an empty claims map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the payload of a JWT without verifying its signature.
    pub fn from_token(token: &str) -> Result<Self, ClaimsError> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ClaimsError::MalformedToken);
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(name, value)| (name, ClaimValue::from(value)))
                .collect()),
            _ => Err(ClaimsError::NotAnObject),
        }
    }

    /// Set a claim.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style [`Claims::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a claim.
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    /// Iterate over claims in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClaimValue)> {
        self.0.iter()
    }

    /// Number of claims.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no claims.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ClaimValue)> for Claims {
    fn from_iter<T: IntoIterator<Item = (String, ClaimValue)>>(iter: T) -> Self {
        Claims(iter.into_iter().collect())
    }
}
