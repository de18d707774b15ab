use console_policy::PolicyError;
use thiserror::Error;

use crate::{AdminError, ClaimsError};

/// Errors from a session check.
///
/// Every variant ends the check; no partial permissions are returned.
/// [`SessionError::is_invalid_session`] separates failures that mean the
/// session cannot be trusted (the caller should log the user out) from
/// failures while processing an otherwise valid session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The request carries no usable session.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// The session token payload could not be decoded.
    #[error("Invalid session token: {0}")]
    Claims(#[source] ClaimsError),

    /// The storage backend refused or failed the admin call.
    #[error("Storage admin call failed: {0}")]
    Admin(#[source] AdminError),

    /// The account policy could not be parsed after substitution.
    #[error("Malformed account policy: {0}")]
    MalformedPolicy(#[source] PolicyError),

    /// The policy parsed but a statement could not be evaluated.
    #[error("Failed to resolve session permissions: {0}")]
    Processing(#[source] PolicyError),
}

impl SessionError {
    /// Whether the caller should treat the session as invalid.
    pub fn is_invalid_session(&self) -> bool {
        !matches!(self, SessionError::Processing(_))
    }

    /// HTTP status the surrounding layer reports for this error.
    pub fn status_code(&self) -> u16 {
        if self.is_invalid_session() { 401 } else { 500 }
    }
}

impl From<ClaimsError> for SessionError {
    fn from(error: ClaimsError) -> Self {
        SessionError::Claims(error)
    }
}

impl From<AdminError> for SessionError {
    fn from(error: AdminError) -> Self {
        SessionError::Admin(error)
    }
}
