use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::{
    Action, ActionKind, ActionSet, ConditionContext, ConditionSet, PolicyError, wildcard,
};

/// Prefix of object storage resource ARNs.
pub const S3_RESOURCE_ARN_PREFIX: &str = "arn:aws:s3:::";

/// Whether a statement grants or revokes its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the statement's actions.
    Allow,
    /// Revokes the statement's actions, overriding any grant.
    Deny,
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => f.write_str("Allow"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

impl TryFrom<&str> for Effect {
    type Error = PolicyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Allow" => Ok(Effect::Allow),
            "Deny" => Ok(Effect::Deny),
            other => Err(PolicyError::InvalidEffect(other.to_string())),
        }
    }
}

/// A single Allow/Deny rule.
///
/// Conditions are kept as the raw operator blocks the document carried and
/// only decoded when they are needed, so a malformed block surfaces as an
/// error at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Optional statement identifier.
    pub sid: Option<String>,
    /// Allow or Deny.
    pub effect: Effect,
    /// Action identifiers or patterns.
    pub actions: ActionSet,
    /// Resource patterns, usually ARNs.
    pub resources: BTreeSet<String>,
    /// Raw `Condition` element: operator → { key → values }.
    pub conditions: Map<String, Value>,
}

impl Statement {
    /// Create an empty statement with the given effect.
    pub fn new(effect: Effect) -> Self {
        Self {
            sid: None,
            effect,
            actions: ActionSet::new(),
            resources: BTreeSet::new(),
            conditions: Map::new(),
        }
    }

    /// Create an empty Allow statement.
    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    /// Create an empty Deny statement.
    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    /// Set the statement identifier.
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Add actions.
    pub fn with_actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        self.actions.extend(actions);
        self
    }

    /// Add resources.
    pub fn with_resources<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    /// Add a raw condition operator block.
    pub fn with_condition(mut self, operator: impl Into<String>, block: Value) -> Self {
        self.conditions.insert(operator.into(), block);
        self
    }

    /// Whether the statement carries any condition block.
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Decode the raw condition blocks.
    pub fn condition_set(&self) -> Result<ConditionSet, PolicyError> {
        ConditionSet::decode(&self.conditions)
    }

    /// Whether one of the resource patterns covers `resource`.
    ///
    /// Patterns are matched with the object storage ARN prefix removed, so
    /// `arn:aws:s3:::*` covers every resource including the empty one.
    pub fn matches_resource(&self, resource: &str) -> bool {
        self.resources.iter().any(|pattern| {
            let pattern = pattern
                .strip_prefix(S3_RESOURCE_ARN_PREFIX)
                .unwrap_or(pattern);
            wildcard::matches(pattern, resource)
        })
    }

    /// Whether this statement applies to `action` on `resource`, ignoring
    /// conditions. Admin and KMS actions are not scoped by resource.
    pub fn applies_to(&self, action: &Action, resource: &str) -> bool {
        if !self.actions.matches(action.as_str()) {
            return false;
        }
        match action.kind() {
            ActionKind::Admin | ActionKind::Kms => true,
            ActionKind::S3 | ActionKind::Other => self.matches_resource(resource),
        }
    }

    /// Whether this statement applies to `action` on `resource` given the
    /// request facts in `context`.
    pub fn is_applicable(
        &self,
        action: &Action,
        resource: &str,
        context: &ConditionContext,
    ) -> Result<bool, PolicyError> {
        if !self.applies_to(action, resource) {
            return Ok(false);
        }
        Ok(self.condition_set()?.evaluate(context))
    }
}
