//! Run configuration.

use crate::action::ActionExecutor;
use crate::driver::DriverConfig;
use crate::result::{VitrineError, VitrineResult};
use crate::wait::{
    WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default storefront under test
pub const DEFAULT_BASE_URL: &str = "https://www.saucedemo.com";

/// Public demo account of the storefront
pub const DEFAULT_USERNAME: &str = "standard_user";

/// Password of the public demo account
pub const DEFAULT_PASSWORD: &str = "secret_sauce";

/// Settings for one suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Storefront root, without trailing slash
    pub base_url: String,
    /// Login name
    pub username: String,
    /// Login password
    pub password: String,
    /// Per-action polling deadline in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Page load deadline in milliseconds
    pub navigation_timeout_ms: u64,
    /// Run the browser without a window
    pub headless: bool,
    /// Concurrent sessions; 0 uses the available parallelism
    pub max_sessions: usize,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Browser executable override
    pub browser_path: Option<String>,
    /// Browser sandbox (disable in containers)
    pub sandbox: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            headless: true,
            max_sessions: 0,
            viewport_width: 1280,
            viewport_height: 800,
            browser_path: None,
            sandbox: true,
        }
    }
}

impl RunConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storefront root
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set login credentials
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the per-action deadline
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the page load deadline
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Cap concurrent sessions
    #[must_use]
    pub const fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Use a specific browser executable
    #[must_use]
    pub fn with_browser_path(mut self, path: impl Into<String>) -> Self {
        self.browser_path = Some(path.into());
        self
    }

    /// Disable the browser sandbox
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Absolute URL of a storefront page
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Polling options for actions and assertions
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Step executor for this configuration
    #[must_use]
    pub const fn executor(&self) -> ActionExecutor {
        ActionExecutor::new(self.wait_options())
            .with_navigation_timeout(Duration::from_millis(self.navigation_timeout_ms))
    }

    /// Browser settings for each session
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        let mut config = DriverConfig::new()
            .headless(self.headless)
            .viewport(self.viewport_width, self.viewport_height)
            .navigation_timeout(Duration::from_millis(self.navigation_timeout_ms));
        if let Some(path) = &self.browser_path {
            config = config.executable_path(path.clone());
        }
        if !self.sandbox {
            config = config.no_sandbox();
        }
        config
    }

    /// Effective session cap
    #[must_use]
    pub fn session_limit(&self) -> usize {
        if self.max_sessions > 0 {
            return self.max_sessions;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }

    /// Reject settings the runner cannot work with
    pub fn validate(&self) -> VitrineResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(VitrineError::config(format!(
                "base URL {:?} must start with http:// or https://",
                self.base_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(VitrineError::config("poll interval must be at least 1ms"));
        }
        if self.navigation_timeout_ms == 0 {
            return Err(VitrineError::config("navigation timeout must be at least 1ms"));
        }
        if self.username.is_empty() {
            return Err(VitrineError::config("username must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.base_url, "https://www.saucedemo.com");
        assert_eq!(config.username, "standard_user");
        assert_eq!(config.timeout_ms, 4_000);
        assert_eq!(config.poll_interval_ms, 50);
        assert!(config.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_joining() {
        let config = RunConfig::new().with_base_url("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.url("/cart.html"), "http://localhost:3000/cart.html");
        assert_eq!(
            config.url("inventory-item.html?id=4"),
            "http://localhost:3000/inventory-item.html?id=4"
        );
    }

    #[test]
    fn test_derived_settings() {
        let config = RunConfig::new()
            .with_timeout(250)
            .with_poll_interval(10)
            .with_headless(false)
            .with_browser_path("/usr/bin/chromium")
            .no_sandbox();
        assert_eq!(config.wait_options().timeout(), Duration::from_millis(250));
        let driver = config.driver_config();
        assert!(!driver.headless);
        assert!(!driver.sandbox);
        assert_eq!(driver.executable_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_session_limit() {
        assert_eq!(RunConfig::new().with_max_sessions(2).session_limit(), 2);
        assert!(RunConfig::new().session_limit() >= 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunConfig::new().with_base_url("www.saucedemo.com").validate().is_err());
        assert!(RunConfig::new().with_poll_interval(0).validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: RunConfig = serde_yaml_ng::from_str("timeout_ms: 1000\nheadless: false").unwrap();
        assert_eq!(config.timeout_ms, 1000);
        assert!(!config.headless);
        assert_eq!(config.password, "secret_sauce");
    }
}
