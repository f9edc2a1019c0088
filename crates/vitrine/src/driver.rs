//! Driver - Abstract Browser Automation Trait
//!
//! The runner only needs a small capability set from a browser: navigate,
//! query by selector, click, set a value, pick an option, read text and
//! attributes, check visibility. Anything that offers those can host a suite.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Driver (async trait)                                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐  │
//! │  │  ChromiumDriver     │        │  MockDriver             │  │
//! │  │  (feature browser)  │        │  (in-memory pages,      │  │
//! │  │  CDP via            │        │   unit + e2e tests)     │  │
//! │  │  chromiumoxide      │        │                         │  │
//! │  └─────────────────────┘        └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::result::VitrineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Snapshot of one DOM element, taken at query time.
///
/// Handles are never cached across steps; every step re-queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementHandle {
    /// Selector the element was found with
    pub selector: String,
    /// Position among the matches of `selector`
    pub index: usize,
    /// Lower-case tag name
    pub tag_name: String,
    /// Trimmed text content
    pub text: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts typed input
    pub editable: bool,
    /// Attribute name to value
    pub attributes: BTreeMap<String, String>,
    /// Option labels, for selection controls
    pub options: Vec<String>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(selector: impl Into<String>, index: usize, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            index,
            tag_name: tag_name.into(),
            enabled: true,
            ..Self::default()
        }
    }

    /// Trimmed text content
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Attribute value, or an empty string if the attribute is absent
    #[must_use]
    pub fn attribute(&self, name: &str) -> &str {
        self.attributes.get(name).map_or("", String::as_str)
    }

    /// Check if element is visible
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Check if element is a selection control
    #[must_use]
    pub fn is_select(&self) -> bool {
        self.tag_name == "select"
    }
}

/// Browser configuration for driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            navigation_timeout: Duration::from_millis(crate::wait::DEFAULT_NAVIGATION_TIMEOUT_MS),
            executable_path: None,
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the browser executable
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Abstract driver trait for browser automation.
///
/// Queries take `&self` and return fresh snapshots; anything that changes the
/// page takes `&mut self`.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to URL and wait for the load to complete
    async fn navigate(&mut self, url: &str) -> VitrineResult<()>;

    /// Get current URL
    async fn current_url(&self) -> VitrineResult<String>;

    /// Query all elements currently matching `selector`, in document order
    async fn query(&self, selector: &str) -> VitrineResult<Vec<ElementHandle>>;

    /// Click element
    async fn click(&mut self, element: &ElementHandle) -> VitrineResult<()>;

    /// Replace the value of an input element
    async fn set_value(&mut self, element: &ElementHandle, text: &str) -> VitrineResult<()>;

    /// Choose the option with the given label in a selection control
    async fn select_option(&mut self, element: &ElementHandle, label: &str) -> VitrineResult<()>;

    /// Go back in history
    async fn go_back(&mut self) -> VitrineResult<()>;

    /// Close the session
    async fn close(&mut self) -> VitrineResult<()>;
}

/// Opens isolated driver sessions, one per scenario group.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Launch a new, isolated session
    async fn launch(&self) -> VitrineResult<Box<dyn Driver>>;
}
