use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Effect, Policy, PolicyError, Statement};

/// Turns raw policy bytes into a structured [`Policy`].
///
/// Implementations must keep statements in document order.
pub trait PolicyParser {
    /// Parse a policy document.
    fn parse(&self, raw: &[u8]) -> Result<Policy, PolicyError>;
}

/// Parser for AWS-style JSON policy documents.
///
/// `Action` and `Resource` may be a single string or a list; `Statement` may
/// be a single object or a list. Resource strings are kept verbatim, so a
/// placeholder that was never substituted (e.g. `${jwt:email}` without an
/// `email` claim) survives into the parsed statement and simply matches
/// nothing real.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPolicyParser;

impl PolicyParser for JsonPolicyParser {
    fn parse(&self, raw: &[u8]) -> Result<Policy, PolicyError> {
        let document: PolicyDocument = serde_json::from_slice(raw)?;

        let statements = match document.statement {
            None => Vec::new(),
            Some(OneOrMany::One(statement)) => vec![statement.into_statement()?],
            Some(OneOrMany::Many(statements)) => statements
                .into_iter()
                .map(StatementDocument::into_statement)
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Policy {
            version: document
                .version
                .unwrap_or_else(|| crate::DEFAULT_VERSION.to_string()),
            id: document.id,
            statements,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument {
    version: Option<String>,
    id: Option<String>,
    statement: Option<OneOrMany<StatementDocument>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatementDocument {
    sid: Option<String>,
    effect: Option<String>,
    action: Option<OneOrMany<String>>,
    resource: Option<OneOrMany<String>>,
    #[serde(default)]
    condition: Map<String, Value>,
}

impl StatementDocument {
    fn into_statement(self) -> Result<Statement, PolicyError> {
        let effect = self.effect.ok_or(PolicyError::MissingField("Effect"))?;
        let effect = Effect::try_from(effect.as_str())?;
        let actions = self.action.ok_or(PolicyError::MissingField("Action"))?;

        let mut statement = Statement::new(effect).with_actions(actions.into_vec());
        statement.sid = self.sid;
        if let Some(resources) = self.resource {
            statement = statement.with_resources(resources.into_vec());
        }
        statement.conditions = self.condition;

        Ok(statement)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}
