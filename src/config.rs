//! Refresh configuration.
//!
//! A [`RefreshConfig`] is what the host shell hands us through the gateway:
//! the brief API base URL and an enabled flag. Disabled or unconfigured is a
//! valid user state, not an error — jobs simply must not run.

use serde::{Deserialize, Serialize};

/// Background-refresh configuration, durable across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Normalized brief API base URL. Empty means unconfigured.
    pub api_base: String,
    /// Whether background refresh is enabled.
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            enabled: true,
        }
    }
}

impl RefreshConfig {
    /// Build a config from raw host input, normalizing the base URL.
    pub fn normalized(api_base: &str, enabled: bool) -> Self {
        Self {
            api_base: normalize_api_base(api_base),
            enabled,
        }
    }

    /// Returns `true` if jobs may run under this configuration.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.api_base.is_empty()
    }
}

/// Normalize a raw base URL: trim surrounding whitespace and strip all
/// trailing slashes. An all-slash or whitespace-only input becomes empty.
pub fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}
