use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a storage admin client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// The storage backend could not be reached.
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the session's credentials.
    #[error("Access denied by storage backend: {0}")]
    AccessDenied(String),

    /// The backend does not support the call (e.g. no KMS configured).
    #[error("Not supported by storage backend: {0}")]
    NotSupported(String),

    /// The backend answered with something unexpected.
    #[error("Unexpected storage backend response: {0}")]
    Response(String),
}

/// Deployment topology reported by the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServerType {
    /// Erasure-coded, possibly distributed, deployment.
    Erasure,
    /// Single-drive filesystem deployment.
    #[serde(rename = "FS")]
    Fs,
    /// Anything the console does not recognize.
    #[default]
    #[serde(other)]
    Unknown,
}

/// What the storage backend reports about the session's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Account identity used for `${aws:username}`.
    pub account_name: String,
    /// The account's effective policy document, unparsed.
    pub policy: Vec<u8>,
    /// Deployment topology.
    pub server_type: ServerType,
}

impl AccountInfo {
    /// Create account info for `account_name` with the given raw policy.
    pub fn new(account_name: impl Into<String>, policy: impl Into<Vec<u8>>) -> Self {
        Self {
            account_name: account_name.into(),
            policy: policy.into(),
            server_type: ServerType::default(),
        }
    }

    /// Set the deployment topology.
    pub fn with_server_type(mut self, server_type: ServerType) -> Self {
        self.server_type = server_type;
        self
    }

    /// Whether the deployment is erasure coded.
    pub fn is_erasure(&self) -> bool {
        self.server_type == ServerType::Erasure
    }
}

/// Key management service status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsStatus {
    /// Name of the KMS.
    pub name: String,
    /// Default key id.
    pub default_key_id: String,
    /// KMS endpoints.
    pub endpoints: Vec<String>,
}

/// The storage admin calls a session check needs. Implementations act with
/// the session's own temporary credentials.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait AdminClient {
    /// Account identity, effective policy and deployment topology.
    async fn account_info(&self) -> Result<AccountInfo, AdminError>;

    /// KMS status; fails when no KMS is configured or reachable.
    async fn kms_status(&self) -> Result<KmsStatus, AdminError>;
}

/// An [`AdminClient`] that answers from fixed values.
#[derive(Debug, Clone)]
pub struct StaticAdminClient {
    account: Result<AccountInfo, AdminError>,
    kms: Result<KmsStatus, AdminError>,
}

impl StaticAdminClient {
    /// Answer `account_info` with `account`; KMS is not configured.
    pub fn new(account: AccountInfo) -> Self {
        Self {
            account: Ok(account),
            kms: Err(AdminError::NotSupported("KMS is not configured".into())),
        }
    }

    /// Fail every call with `error`.
    pub fn failing(error: AdminError) -> Self {
        Self {
            account: Err(error.clone()),
            kms: Err(error),
        }
    }

    /// Answer `kms_status` with `status`.
    pub fn with_kms(mut self, status: KmsStatus) -> Self {
        self.kms = Ok(status);
        self
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AdminClient for StaticAdminClient {
    async fn account_info(&self) -> Result<AccountInfo, AdminError> {
        self.account.clone()
    }

    async fn kms_status(&self) -> Result<KmsStatus, AdminError> {
        self.kms.clone()
    }
}
