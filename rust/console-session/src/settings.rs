//! Console deployment settings.
//!
//! Settings come from `CONSOLE_*` environment variables. [`Settings::from_lookup`]
//! accepts any lookup function so that callers (and tests) can supply values
//! without touching the process environment.

use serde::{Deserialize, Serialize};
use url::Url;

/// Storage endpoint the console talks to.
pub const CONSOLE_MINIO_SERVER: &str = "CONSOLE_MINIO_SERVER";
/// Region of the storage deployment.
pub const CONSOLE_MINIO_REGION: &str = "CONSOLE_MINIO_REGION";
/// Log search service URL; enables the `log-search` feature.
pub const CONSOLE_LOG_QUERY_URL: &str = "CONSOLE_LOG_QUERY_URL";
/// OpenID provider URL.
pub const CONSOLE_IDP_URL: &str = "CONSOLE_IDP_URL";
/// OpenID client id.
pub const CONSOLE_IDP_CLIENT_ID: &str = "CONSOLE_IDP_CLIENT_ID";
/// `on` to enable directory (LDAP) login.
pub const CONSOLE_LDAP_ENABLED: &str = "CONSOLE_LDAP_ENABLED";
/// Upload concurrency limit handed to the UI.
pub const CONSOLE_MAX_CONCURRENT_UPLOADS: &str = "CONSOLE_MAX_CONCURRENT_UPLOADS";
/// Download concurrency limit handed to the UI.
pub const CONSOLE_MAX_CONCURRENT_DOWNLOADS: &str = "CONSOLE_MAX_CONCURRENT_DOWNLOADS";

/// Default storage endpoint.
pub const DEFAULT_SERVER: &str = "http://localhost:9000";
/// Default upload concurrency limit.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: u32 = 10;
/// Default download concurrency limit.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: u32 = 20;

/// Deployment settings relevant to session checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Storage endpoint URL.
    pub server: String,
    /// Storage region; usually empty.
    pub region: String,
    /// Log search service URL; empty when disabled.
    pub log_search_url: String,
    /// OpenID provider URL; empty when disabled.
    pub idp_url: String,
    /// OpenID client id; empty when disabled.
    pub idp_client_id: String,
    /// Whether directory (LDAP) login is enabled.
    pub ldap_enabled: bool,
    /// Upload concurrency limit.
    pub max_concurrent_uploads: u32,
    /// Download concurrency limit.
    pub max_concurrent_downloads: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            region: String::new(),
            log_search_url: String::new(),
            idp_url: String::new(),
            idp_client_id: String::new(),
            ldap_enabled: false,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset or
    /// unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).unwrap_or_default();
        let limit = |name: &str, default: u32| {
            lookup(name)
                .and_then(|value| value.trim().parse::<u32>().ok())
                .unwrap_or(default)
        };

        Self {
            server: lookup(CONSOLE_MINIO_SERVER)
                .map(|server| server.trim().to_string())
                .filter(|server| !server.is_empty())
                .unwrap_or(defaults.server),
            region: text(CONSOLE_MINIO_REGION),
            log_search_url: text(CONSOLE_LOG_QUERY_URL),
            idp_url: text(CONSOLE_IDP_URL),
            idp_client_id: text(CONSOLE_IDP_CLIENT_ID),
            ldap_enabled: lookup(CONSOLE_LDAP_ENABLED)
                .is_some_and(|value| value.eq_ignore_ascii_case("on")),
            max_concurrent_uploads: limit(
                CONSOLE_MAX_CONCURRENT_UPLOADS,
                defaults.max_concurrent_uploads,
            ),
            max_concurrent_downloads: limit(
                CONSOLE_MAX_CONCURRENT_DOWNLOADS,
                defaults.max_concurrent_downloads,
            ),
        }
    }

    /// Set the storage endpoint.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Set the storage region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Whether the storage endpoint is reached over TLS. An endpoint that
    /// does not parse as a URL is treated as plain.
    pub fn is_secure(&self) -> bool {
        Url::parse(&self.server).is_ok_and(|url| url.scheme() == "https")
    }

    /// Whether single sign-on through an OpenID provider is configured.
    pub fn is_idp_enabled(&self) -> bool {
        !self.idp_url.is_empty() && !self.idp_client_id.is_empty()
    }

    /// Whether log search is configured.
    pub fn is_log_search_enabled(&self) -> bool {
        !self.log_search_url.is_empty()
    }
}
