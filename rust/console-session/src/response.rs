use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AdminClient, AllowResource, PermissionMap, Principal, Resolution, Settings};

/// Feature flags the UI toggles on.
pub mod features {
    /// Log search is configured.
    pub const LOG_SEARCH: &str = "log-search";
    /// Login through an OpenID provider is configured.
    pub const OIDC_IDP: &str = "oidc-idp";
    /// Login through directory (LDAP) is configured.
    pub const LDAP_IDP: &str = "ldap-idp";
    /// Some external identity provider is configured.
    pub const EXTERNAL_IDP: &str = "external-idp";
    /// The session asked to hide the navigation menu.
    pub const HIDE_MENU: &str = "hide-menu";
    /// The session is restricted to the object browser.
    pub const OBJECT_BROWSER_ONLY: &str = "object-browser-only";
    /// The backend has a working KMS.
    pub const KMS: &str = "kms";
}

/// Status reported for a valid session.
pub const SESSION_STATUS_OK: &str = "ok";

/// Limits the UI applies to transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConstants {
    /// Concurrent upload limit.
    pub max_concurrent_uploads: u32,
    /// Concurrent download limit.
    pub max_concurrent_downloads: u32,
}

impl From<&Settings> for EnvironmentConstants {
    fn from(settings: &Settings) -> Self {
        Self {
            max_concurrent_uploads: settings.max_concurrent_uploads,
            max_concurrent_downloads: settings.max_concurrent_downloads,
        }
    }
}

/// Body of a successful session check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Enabled UI features, see [`features`].
    pub features: Vec<String>,
    /// Always [`SESSION_STATUS_OK`].
    pub status: String,
    /// Whether the console runs as a cluster operator console.
    pub operator: bool,
    /// Whether the backend is an erasure-coded deployment.
    pub distributed_mode: bool,
    /// Resource → action names, both in lexicographic order.
    pub permissions: BTreeMap<String, Vec<String>>,
    /// Conditioned grants.
    pub allow_resources: Vec<AllowResource>,
    /// Custom style blob from login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_styles: Option<String>,
    /// Transfer limits.
    pub env_constants: EnvironmentConstants,
    /// Storage endpoint.
    pub server_end_point: String,
}

impl SessionResponse {
    /// Start a response for a resolved session.
    pub fn builder(resolution: Resolution) -> SessionResponseBuilder {
        SessionResponseBuilder::new(resolution)
    }
}

/// Assembles a [`SessionResponse`].
#[derive(Debug, Clone)]
pub struct SessionResponseBuilder {
    resolution: Resolution,
    features: Vec<String>,
    distributed_mode: bool,
    custom_styles: Option<String>,
    env_constants: EnvironmentConstants,
    server_end_point: String,
}

impl SessionResponseBuilder {
    /// Start from resolved permissions with default settings.
    pub fn new(resolution: Resolution) -> Self {
        let settings = Settings::default();
        Self {
            resolution,
            features: Vec::new(),
            distributed_mode: false,
            custom_styles: None,
            env_constants: EnvironmentConstants::from(&settings),
            server_end_point: settings.server,
        }
    }

    /// Set the enabled features.
    pub fn features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    /// Set whether the backend is erasure coded.
    pub fn distributed_mode(mut self, distributed_mode: bool) -> Self {
        self.distributed_mode = distributed_mode;
        self
    }

    /// Set the custom style blob.
    pub fn custom_styles(mut self, custom_styles: Option<String>) -> Self {
        self.custom_styles = custom_styles;
        self
    }

    /// Take transfer limits and endpoint from `settings`.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.env_constants = EnvironmentConstants::from(settings);
        self.server_end_point = settings.server.clone();
        self
    }

    /// Finish the response.
    pub fn build(self) -> SessionResponse {
        SessionResponse {
            features: self.features,
            status: SESSION_STATUS_OK.to_string(),
            operator: false,
            distributed_mode: self.distributed_mode,
            permissions: permission_table(&self.resolution.permissions),
            allow_resources: self.resolution.allow_resources,
            custom_styles: self.custom_styles,
            env_constants: self.env_constants,
            server_end_point: self.server_end_point,
        }
    }
}

/// Render a [`PermissionMap`] as resource → action names.
pub fn permission_table(permissions: &PermissionMap) -> BTreeMap<String, Vec<String>> {
    permissions
        .iter()
        .map(|(resource, actions)| (resource.clone(), actions.to_strings()))
        .collect()
}

/// Features enabled for `principal`, in the order the UI expects.
///
/// `kms` is reported only when the admin client's KMS status call succeeds.
pub async fn enabled_features<A>(admin: &A, principal: &Principal, settings: &Settings) -> Vec<String>
where
    A: AdminClient + ?Sized,
{
    let mut enabled = Vec::new();

    if settings.is_log_search_enabled() {
        enabled.push(features::LOG_SEARCH);
    }
    if settings.is_idp_enabled() {
        enabled.extend([features::OIDC_IDP, features::EXTERNAL_IDP]);
    }
    if settings.ldap_enabled {
        enabled.extend([features::LDAP_IDP, features::EXTERNAL_IDP]);
    }
    if principal.hide_menu {
        enabled.push(features::HIDE_MENU);
    }
    if principal.object_browser_only {
        enabled.push(features::OBJECT_BROWSER_ONLY);
    }
    match admin.kms_status().await {
        Ok(_) => enabled.push(features::KMS),
        Err(error) => tracing::trace!(%error, "kms feature disabled"),
    }

    enabled.into_iter().map(String::from).collect()
}
