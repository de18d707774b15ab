use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Authenticated session identity.
///
/// Built by the authentication layer from the decrypted session cookie and
/// immutable for the rest of the request. The console always talks to the
/// storage backend with the temporary credentials it carries.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Principal {
    /// Temporary access key.
    pub sts_access_key_id: String,
    /// Temporary secret key.
    pub sts_secret_access_key: String,
    /// Temporary session token; a JWT whose claims describe the identity.
    pub sts_session_token: String,
    /// The account the temporary credentials were issued for.
    pub account_access_key: String,
    /// Hide the navigation menu.
    #[serde(default)]
    pub hide_menu: bool,
    /// Restrict the UI to the object browser.
    #[serde(default)]
    pub object_browser_only: bool,
    /// Opaque custom style blob supplied at login.
    #[serde(default)]
    pub custom_style: Option<String>,
}

impl Principal {
    /// Create a principal from its temporary credentials.
    pub fn new(
        sts_access_key_id: impl Into<String>,
        sts_secret_access_key: impl Into<String>,
        sts_session_token: impl Into<String>,
        account_access_key: impl Into<String>,
    ) -> Self {
        Self {
            sts_access_key_id: sts_access_key_id.into(),
            sts_secret_access_key: sts_secret_access_key.into(),
            sts_session_token: sts_session_token.into(),
            account_access_key: account_access_key.into(),
            ..Self::default()
        }
    }

    /// Set the hide-menu flag.
    pub fn with_hide_menu(mut self, hide_menu: bool) -> Self {
        self.hide_menu = hide_menu;
        self
    }

    /// Set the object-browser-only flag.
    pub fn with_object_browser_only(mut self, object_browser_only: bool) -> Self {
        self.object_browser_only = object_browser_only;
        self
    }

    /// Set the custom style blob.
    pub fn with_custom_style(mut self, custom_style: impl Into<String>) -> Self {
        self.custom_style = Some(custom_style.into());
        self
    }
}

impl Debug for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("sts_access_key_id", &self.sts_access_key_id)
            .field("sts_secret_access_key", &"<redacted>")
            .field("sts_session_token", &"<redacted>")
            .field("account_access_key", &self.account_access_key)
            .field("hide_menu", &self.hide_menu)
            .field("object_browser_only", &self.object_browser_only)
            .field("custom_style", &self.custom_style)
            .finish()
    }
}
