//! Result and error types for Vitrine.

use thiserror::Error;

/// Result type for Vitrine operations
pub type VitrineResult<T> = Result<T, VitrineError>;

/// Errors that can occur while running a scenario.
///
/// Every variant is terminal to the step that raised it. Polling already
/// happened inside Locate/assert before any of these are produced.
#[derive(Debug, Error)]
pub enum VitrineError {
    /// Page load did not complete
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Locator never resolved within the polling deadline
    #[error("No element matching `{selector}`{} within {timeout_ms}ms", index_suffix(.index))]
    ElementNotFound {
        /// Selector that was polled
        selector: String,
        /// Requested index, if any
        index: Option<usize>,
        /// Polling deadline in milliseconds
        timeout_ms: u64,
    },

    /// Element exists but cannot receive the action
    #[error("Element `{selector}` is not interactable: {reason}")]
    NotInteractable {
        /// Selector of the element
        selector: String,
        /// Why the element refused the action
        reason: String,
    },

    /// Selection control has no option with the requested label
    #[error("Option {option:?} not found in `{selector}` (available: {})", .available.join(", "))]
    OptionNotFound {
        /// Selector of the select control
        selector: String,
        /// Requested option label
        option: String,
        /// Labels that were present
        available: Vec<String>,
    },

    /// Assertion never matched within the polling deadline
    #[error("Timed out after {timeout_ms}ms waiting for {condition}: expected {expected:?}, last observed {actual:?}")]
    AssertionTimeout {
        /// Condition being asserted
        condition: String,
        /// Last observed value
        actual: String,
        /// Expected value
        expected: String,
        /// Polling deadline in milliseconds
        timeout_ms: u64,
    },

    /// Recall of a key that was never captured in this scenario
    #[error("Nothing captured under key {key:?} in this scenario")]
    MissingCapture {
        /// Key that was recalled
        key: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Driver-level failure (protocol, evaluation, closed session)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Step parameters could not be resolved
    #[error("Invalid step: {message}")]
    InvalidStep {
        /// Error message
        message: String,
    },

    /// The run was cancelled while the step was in flight
    #[error("Run cancelled")]
    Cancelled,

    /// No group with this name in the suite
    #[error("Unknown group {name:?} (available: {})", .available.join(", "))]
    UnknownGroup {
        /// Requested group
        name: String,
        /// Groups in the suite
        available: Vec<String>,
    },

    /// Invalid run configuration
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

fn index_suffix(index: &Option<usize>) -> String {
    index.map(|i| format!(" at index {i}")).unwrap_or_default()
}

impl VitrineError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an invalid step error
    #[must_use]
    pub fn invalid_step(message: impl Into<String>) -> Self {
        Self::InvalidStep {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error comes from the run setup rather than a scenario
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::UnknownGroup { .. } | Self::Config { .. } | Self::Yaml(_) | Self::Io(_)
        )
    }

    /// Last observed value, for failures that carry one
    #[must_use]
    pub fn actual(&self) -> Option<&str> {
        match self {
            Self::AssertionTimeout { actual, .. } => Some(actual),
            _ => None,
        }
    }

    /// Expected value, for failures that carry one
    #[must_use]
    pub fn expected(&self) -> Option<&str> {
        match self {
            Self::AssertionTimeout { expected, .. } => Some(expected),
            Self::OptionNotFound { option, .. } => Some(option),
            Self::MissingCapture { key } => Some(key),
            _ => None,
        }
    }

    /// Selector or condition the failure is about
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::ElementNotFound { selector, .. }
            | Self::NotInteractable { selector, .. }
            | Self::OptionNotFound { selector, .. } => Some(selector),
            Self::AssertionTimeout { condition, .. } => Some(condition),
            Self::Navigation { url, .. } => Some(url),
            _ => None,
        }
    }
}
