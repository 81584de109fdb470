//! Configuration types for wa-bridge.

use std::env;

/// Daemon address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Configuration for connecting to the bridge daemon.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the daemon HTTP server (e.g., "http://127.0.0.1:8080").
    pub base_url: String,
    /// Paired account for multi-account daemons.
    /// If None, assumes single-account mode.
    pub account: Option<String>,
}

impl BridgeConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            account: None,
        }
    }

    /// Create configuration with a specific account for multi-account mode.
    pub fn with_account(base_url: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            account: Some(account.into()),
        }
    }

    /// Load configuration from `BRIDGE_URL` and `BRIDGE_ACCOUNT`.
    pub fn from_env() -> Self {
        let base_url = env::var("BRIDGE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        match env::var("BRIDGE_ACCOUNT") {
            Ok(account) if !account.is_empty() => Self::with_account(base_url, account),
            _ => Self::new(base_url),
        }
    }

    /// Get the RPC endpoint URL.
    pub fn rpc_url(&self) -> String {
        format!("{}/api/v1/rpc", self.base_url.trim_end_matches('/'))
    }

    /// Get the events endpoint URL (with account query param if set).
    pub fn events_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.account {
            Some(account) => {
                let encoded = urlencoding::encode(account);
                format!("{}/api/v1/events?account={}", base, encoded)
            }
            None => format!("{}/api/v1/events", base),
        }
    }

    /// Get the health check endpoint URL.
    pub fn check_url(&self) -> String {
        format!("{}/api/v1/check", self.base_url.trim_end_matches('/'))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
