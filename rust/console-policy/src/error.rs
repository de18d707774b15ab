use thiserror::Error;

/// Errors produced while parsing a policy document or decoding its
/// condition blocks.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The document is not valid JSON or does not have the policy shape.
    #[error("Invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A statement carries an effect other than `Allow` or `Deny`.
    #[error("Invalid effect '{0}', expected 'Allow' or 'Deny'")]
    InvalidEffect(String),

    /// A statement is missing a required field.
    #[error("Statement is missing required field '{0}'")]
    MissingField(&'static str),

    /// A condition block cannot be decoded into operator → key → values.
    #[error("Malformed condition block '{operator}': {reason}")]
    MalformedCondition {
        /// The operator whose block failed to decode.
        operator: String,
        /// Description of what was wrong with it.
        reason: String,
    },
}

impl PolicyError {
    pub(crate) fn malformed_condition(operator: &str, reason: impl Into<String>) -> Self {
        Self::MalformedCondition {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }
}
