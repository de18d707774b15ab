use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::wildcard;

/// Creating access keys. The console grants it by default whenever a Deny
/// restricts it only under a condition.
pub const CREATE_SERVICE_ACCOUNT_ADMIN_ACTION: &str = "admin:CreateServiceAccount";

/// Object storage actions the console can render.
pub const S3_ACTIONS: &[&str] = &[
    "s3:AbortMultipartUpload",
    "s3:BypassGovernanceRetention",
    "s3:CreateBucket",
    "s3:DeleteBucket",
    "s3:DeleteBucketCors",
    "s3:DeleteBucketPolicy",
    "s3:DeleteObject",
    "s3:DeleteObjectTagging",
    "s3:DeleteObjectVersion",
    "s3:DeleteObjectVersionTagging",
    "s3:ForceDeleteBucket",
    "s3:GetBucketCors",
    "s3:GetBucketEncryption",
    "s3:GetBucketLocation",
    "s3:GetBucketNotification",
    "s3:GetBucketObjectLockConfiguration",
    "s3:GetBucketPolicy",
    "s3:GetBucketPolicyStatus",
    "s3:GetBucketTagging",
    "s3:GetBucketVersioning",
    "s3:GetLifecycleConfiguration",
    "s3:GetObject",
    "s3:GetObjectAttributes",
    "s3:GetObjectLegalHold",
    "s3:GetObjectRetention",
    "s3:GetObjectTagging",
    "s3:GetObjectVersion",
    "s3:GetObjectVersionAttributes",
    "s3:GetObjectVersionForReplication",
    "s3:GetObjectVersionTagging",
    "s3:GetReplicationConfiguration",
    "s3:HeadBucket",
    "s3:ListAllMyBuckets",
    "s3:ListBucket",
    "s3:ListBucketMultipartUploads",
    "s3:ListBucketVersions",
    "s3:ListMultipartUploadParts",
    "s3:ListenBucketNotification",
    "s3:ListenNotification",
    "s3:PutBucketCors",
    "s3:PutBucketEncryption",
    "s3:PutBucketNotification",
    "s3:PutBucketObjectLockConfiguration",
    "s3:PutBucketPolicy",
    "s3:PutBucketTagging",
    "s3:PutBucketVersioning",
    "s3:PutLifecycleConfiguration",
    "s3:PutObject",
    "s3:PutObjectFanOut",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:PutReplicationConfiguration",
    "s3:ReplicateDelete",
    "s3:ReplicateObject",
    "s3:ReplicateTags",
    "s3:ResetBucketReplicationState",
    "s3:RestoreObject",
];

/// Cluster administration actions the console can render.
pub const ADMIN_ACTIONS: &[&str] = &[
    "admin:AddUserToGroup",
    "admin:AttachUserOrGroupPolicy",
    "admin:BandwidthMonitor",
    "admin:ConfigUpdate",
    "admin:ConsoleLog",
    "admin:CreatePolicy",
    "admin:CreateServiceAccount",
    "admin:CreateUser",
    "admin:DataUsageInfo",
    "admin:DeletePolicy",
    "admin:DeleteUser",
    "admin:DisableGroup",
    "admin:DisableUser",
    "admin:EnableGroup",
    "admin:EnableUser",
    "admin:GetBucketQuota",
    "admin:GetBucketTarget",
    "admin:GetGroup",
    "admin:GetPolicy",
    "admin:GetUser",
    "admin:Heal",
    "admin:InspectData",
    "admin:KMSCreateKey",
    "admin:KMSKeyStatus",
    "admin:ListBatchJobs",
    "admin:ListGroups",
    "admin:ListServiceAccounts",
    "admin:ListTier",
    "admin:ListUserPolicies",
    "admin:ListUsers",
    "admin:OBDInfo",
    "admin:Profiling",
    "admin:Prometheus",
    "admin:RemoveServiceAccount",
    "admin:RemoveUserFromGroup",
    "admin:ServerInfo",
    "admin:ServerTrace",
    "admin:ServerUpdate",
    "admin:ServiceRestart",
    "admin:ServiceStop",
    "admin:SetBucketQuota",
    "admin:SetBucketTarget",
    "admin:SetTier",
    "admin:StorageInfo",
    "admin:TopLocksInfo",
    "admin:UpdateServiceAccount",
];

/// Key management actions the console can render.
pub const KMS_ACTIONS: &[&str] = &[
    "kms:API",
    "kms:CreateKey",
    "kms:DeleteKey",
    "kms:KeyStatus",
    "kms:ListKeys",
    "kms:Metrics",
    "kms:Status",
];

/// Which service an action belongs to, judged by its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// `s3:*` actions, scoped by resource.
    S3,
    /// `admin:*` actions, not scoped by resource.
    Admin,
    /// `kms:*` actions, not scoped by resource.
    Kms,
    /// Anything else.
    Other,
}

/// An action identifier such as `s3:GetObject`, or a pattern such as `s3:Get*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Create a new action.
    pub fn new(action: impl Into<String>) -> Self {
        Self(action.into())
    }

    /// The action as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The service this action belongs to.
    pub fn kind(&self) -> ActionKind {
        if self.0.starts_with("s3:") {
            ActionKind::S3
        } else if self.0.starts_with("admin:") {
            ActionKind::Admin
        } else if self.0.starts_with("kms:") {
            ActionKind::Kms
        } else {
            ActionKind::Other
        }
    }

    /// Whether this action, read as a pattern, covers the given concrete action.
    pub fn matches(&self, action: &str) -> bool {
        wildcard::matches(&self.0, action)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Deduplicated set of actions with a stable, lexicographic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action the console knows about (S3, admin and KMS).
    pub fn catalog() -> Self {
        S3_ACTIONS
            .iter()
            .chain(ADMIN_ACTIONS)
            .chain(KMS_ACTIONS)
            .map(|action| Action::from(*action))
            .collect()
    }

    /// Add an action; returns false if it was already present.
    pub fn insert(&mut self, action: impl Into<Action>) -> bool {
        self.0.insert(action.into())
    }

    /// Whether the set holds this exact action.
    pub fn contains(&self, action: &str) -> bool {
        self.0.iter().any(|candidate| candidate.as_str() == action)
    }

    /// Whether any member, read as a pattern, covers the given action.
    pub fn matches(&self, action: &str) -> bool {
        self.0.iter().any(|pattern| pattern.matches(action))
    }

    /// Actions present in either set.
    pub fn union(&self, other: &ActionSet) -> ActionSet {
        ActionSet(self.0.union(&other.0).cloned().collect())
    }

    /// Actions of this set that are not in `other`.
    pub fn difference(&self, other: &ActionSet) -> ActionSet {
        ActionSet(self.0.difference(&other.0).cloned().collect())
    }

    /// Actions present in both sets.
    pub fn intersection(&self, other: &ActionSet) -> ActionSet {
        ActionSet(self.0.intersection(&other.0).cloned().collect())
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    /// The actions as plain strings, in lexicographic order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|action| action.to_string()).collect()
    }
}

impl<A: Into<Action>> FromIterator<A> for ActionSet {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        ActionSet(iter.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Action>> Extend<A> for ActionSet {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for ActionSet {
    type Item = Action;
    type IntoIter = std::collections::btree_set::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::collections::btree_set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
