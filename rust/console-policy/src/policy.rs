use crate::{Action, ActionSet, ConditionContext, Effect, PolicyError, Statement};

/// Default policy language version.
pub const DEFAULT_VERSION: &str = "2012-10-17";

/// A policy document: statements in document order.
///
/// Order matters to consumers that fold over statements (a Deny can only
/// retract what earlier statements granted), so it is preserved exactly as
/// the document listed it.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Policy language version.
    pub version: String,
    /// Optional policy identifier.
    pub id: Option<String>,
    /// Statements in document order.
    pub statements: Vec<Statement>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            id: None,
            statements: Vec::new(),
        }
    }
}

impl Policy {
    /// Create an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy from statements.
    pub fn with_statements(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            ..Self::default()
        }
    }

    /// Append a statement.
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Whether `action` on `resource` is allowed: some Allow statement
    /// applies and no Deny statement does.
    pub fn is_allowed(
        &self,
        action: &Action,
        resource: &str,
        context: &ConditionContext,
    ) -> Result<bool, PolicyError> {
        let mut allowed = false;
        for statement in &self.statements {
            if statement.is_applicable(action, resource, context)? {
                match statement.effect {
                    Effect::Deny => return Ok(false),
                    Effect::Allow => allowed = true,
                }
            }
        }
        Ok(allowed)
    }

    /// Every catalog action allowed on `resource` under `context`.
    ///
    /// Condition blocks are decoded and evaluated once per statement rather
    /// than once per action.
    pub fn allowed_actions(
        &self,
        resource: &str,
        context: &ConditionContext,
    ) -> Result<ActionSet, PolicyError> {
        let mut applicable = Vec::with_capacity(self.statements.len());
        for statement in &self.statements {
            if statement.condition_set()?.evaluate(context) {
                applicable.push(statement);
            }
        }

        let allowed = ActionSet::catalog()
            .into_iter()
            .filter(|action| {
                let mut granted = false;
                for statement in &applicable {
                    if statement.applies_to(action, resource) {
                        match statement.effect {
                            Effect::Deny => return false,
                            Effect::Allow => granted = true,
                        }
                    }
                }
                granted
            })
            .collect::<ActionSet>();

        tracing::trace!(
            resource,
            statements = self.statements.len(),
            applicable = applicable.len(),
            allowed = allowed.len(),
            "computed allowed actions"
        );

        Ok(allowed)
    }
}
