use console_policy::ConditionSet;
use serde::{Deserialize, Serialize};

/// A resource an Allow statement grants only under a condition, with the
/// object-path prefixes the condition restricts listing to.
///
/// The UI uses these to scope the object browser: a grant on `bucket` that is
/// conditioned on `s3:prefix` in `["docs/"]` lets the user browse `docs/`
/// even though the bucket root is not listable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowResource {
    /// Resource as written in the statement.
    pub resource: String,
    /// `s3:prefix` values of the operator block; empty when the block does
    /// not restrict prefixes.
    pub prefixes: Vec<String>,
    /// Operator of the block, e.g. `StringLike`.
    pub condition_operator: String,
}

impl AllowResource {
    /// One entry per operator block of `conditions`, in operator order.
    pub fn from_conditions(resource: &str, conditions: &ConditionSet) -> Vec<AllowResource> {
        conditions
            .iter()
            .map(|(operator, block)| AllowResource {
                resource: resource.to_string(),
                prefixes: block.prefixes(),
                condition_operator: operator.clone(),
            })
            .collect()
    }
}
