//! Folding a policy into per-resource permissions.
//!
//! The console shows each resource with the actions the session may perform
//! on it. Statements are folded front to back into two request-local maps:
//! `permissions` (what is granted so far) and `denied` (what has been
//! explicitly denied so far). A Deny retracts earlier grants for the same
//! resource and keeps later Allows from granting the action again, so
//! statement order decides what a Deny can see but never lets an Allow win.

use std::collections::BTreeMap;

use console_policy::{
    ActionSet, CREATE_SERVICE_ACCOUNT_ADMIN_ACTION, ConditionContext, Effect, Policy, PolicyError,
    Statement,
};
use serde::Serialize;

use crate::AllowResource;

/// Key of the global entry in a [`PermissionMap`].
pub const GLOBAL_RESOURCE: &str = "";

/// Resource → actions. The [`GLOBAL_RESOURCE`] entry holds the actions that
/// apply regardless of resource.
pub type PermissionMap = BTreeMap<String, ActionSet>;

/// Outcome of folding a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Granted actions per resource.
    pub permissions: PermissionMap,
    /// Conditioned grants, in statement order.
    pub allow_resources: Vec<AllowResource>,
}

/// Actions granted without naming a resource.
///
/// These are the catalog actions the policy allows on the empty resource
/// under `context`. A Deny that is scoped by a condition and names
/// `admin:CreateServiceAccount` still leaves the action available, since
/// users may create access keys restricted by that condition.
pub fn default_actions(
    policy: &Policy,
    context: &ConditionContext,
) -> Result<ActionSet, PolicyError> {
    let mut actions = policy.allowed_actions(GLOBAL_RESOURCE, context)?;

    let conditioned_service_accounts = policy.statements.iter().any(|statement| {
        statement.effect == Effect::Deny
            && statement.has_conditions()
            && statement
                .actions
                .contains(CREATE_SERVICE_ACCOUNT_ADMIN_ACTION)
    });
    if conditioned_service_accounts {
        actions.insert(CREATE_SERVICE_ACCOUNT_ADMIN_ACTION);
    }

    Ok(actions)
}

/// Fold `policy` into a [`Resolution`] under `context`.
///
/// Fails only when a condition block cannot be decoded; no partial result is
/// returned in that case.
pub fn aggregate(policy: &Policy, context: &ConditionContext) -> Result<Resolution, PolicyError> {
    let mut aggregator = Aggregator::new(default_actions(policy, context)?);
    for statement in &policy.statements {
        aggregator.apply(statement)?;
    }
    let resolution = aggregator.finish();

    tracing::debug!(
        statements = policy.statements.len(),
        resources = resolution.permissions.len(),
        allow_resources = resolution.allow_resources.len(),
        "aggregated policy permissions"
    );

    Ok(resolution)
}

/// Incremental Allow/Deny fold over statements.
#[derive(Debug, Clone)]
pub struct Aggregator {
    defaults: ActionSet,
    permissions: PermissionMap,
    denied: PermissionMap,
    allow_resources: Vec<AllowResource>,
}

impl Aggregator {
    /// Start a fold whose global entry, and the seed of every resource entry,
    /// is `defaults`.
    pub fn new(defaults: ActionSet) -> Self {
        let mut permissions = PermissionMap::new();
        permissions.insert(GLOBAL_RESOURCE.to_string(), defaults.clone());
        Self {
            defaults,
            permissions,
            denied: PermissionMap::new(),
            allow_resources: Vec::new(),
        }
    }

    /// Apply the next statement.
    pub fn apply(&mut self, statement: &Statement) -> Result<(), PolicyError> {
        tracing::trace!(
            sid = statement.sid.as_deref(),
            effect = %statement.effect,
            actions = statement.actions.len(),
            resources = statement.resources.len(),
            "applying statement"
        );

        match statement.effect {
            Effect::Allow => {
                let conditions = statement.condition_set()?;
                for resource in &statement.resources {
                    self.allow(resource, &statement.actions);
                    self.allow_resources
                        .extend(AllowResource::from_conditions(resource, &conditions));
                }
            }
            Effect::Deny => {
                for resource in &statement.resources {
                    self.deny(resource, &statement.actions);
                }
            }
        }
        Ok(())
    }

    /// Granted actions so far.
    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// Denied actions so far.
    pub fn denied(&self) -> &PermissionMap {
        &self.denied
    }

    /// End the fold.
    pub fn finish(self) -> Resolution {
        Resolution {
            permissions: self.permissions,
            allow_resources: self.allow_resources,
        }
    }

    fn allow(&mut self, resource: &str, actions: &ActionSet) {
        let denied = self.denied.get(resource);
        let subtract = |set: &ActionSet| match denied {
            Some(denied) => set.difference(denied),
            None => set.clone(),
        };

        let candidates = subtract(actions);
        let merged = match self.permissions.get(resource) {
            Some(current) => current.union(&candidates),
            None => subtract(&self.defaults).union(&candidates),
        };
        self.permissions.insert(resource.to_string(), merged);
    }

    fn deny(&mut self, resource: &str, actions: &ActionSet) {
        let denied = self
            .denied
            .entry(resource.to_string())
            .or_default();
        denied.extend(actions.iter().cloned());

        if let Some(current) = self.permissions.get_mut(resource) {
            *current = current.difference(denied);
        }
    }
}
