//! Step vocabulary.
//!
//! Steps are plain data: they deserialize from suite files and describe
//! themselves for reports. Execution lives in [`crate::action`].

use crate::compare::SortOrder;
use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an assertion observes, re-read on every poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// Current page URL
    Url,
    /// Trimmed text of an element
    Text(Locator),
    /// Attribute of an element
    Attribute {
        /// Element
        target: Locator,
        /// Attribute name
        name: String,
    },
    /// A value captured earlier in the scenario
    Captured(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => f.write_str("url"),
            Self::Text(target) => write!(f, "text of {target}"),
            Self::Attribute { target, name } => write!(f, "{name} of {target}"),
            Self::Captured(key) => write!(f, "captured {key}"),
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, from = "ExpectedRepr")]
pub enum Expected {
    /// Value captured earlier in the scenario
    Recall {
        /// Capture key
        recall: String,
    },
    /// Literal value
    Literal(String),
}

impl Expected {
    /// A literal value
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// A recalled capture
    #[must_use]
    pub fn recall(key: impl Into<String>) -> Self {
        Self::Recall { recall: key.into() }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value:?}"),
            Self::Recall { recall } => write!(f, "recalled {recall}"),
        }
    }
}

// Suite files may write unquoted numbers and booleans as literals.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpectedRepr {
    Recall { recall: String },
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<ExpectedRepr> for Expected {
    fn from(repr: ExpectedRepr) -> Self {
        match repr {
            ExpectedRepr::Recall { recall } => Self::Recall { recall },
            ExpectedRepr::Text(s) => Self::Literal(s),
            ExpectedRepr::Integer(n) => Self::Literal(n.to_string()),
            ExpectedRepr::Float(n) => Self::Literal(n.to_string()),
            ExpectedRepr::Bool(b) => Self::Literal(b.to_string()),
        }
    }
}

/// One atomic browser action or assertion.
///
/// String parameters (URLs, texts, capture keys, selectors) may use
/// `{index}` and `{ordinal}` inside a [`Step::ForEach`]; `{{` and `}}`
/// write literal braces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Load a URL
    Navigate {
        /// Absolute URL
        url: String,
    },
    /// Go back one history entry
    GoBack,
    /// Wait for an element to exist
    Locate {
        /// Element
        target: Locator,
    },
    /// Replace the value of an input
    Type {
        /// Input element
        target: Locator,
        /// Text to enter
        text: String,
    },
    /// Click an element
    Click {
        /// Element
        target: Locator,
    },
    /// Pick an option of a selection control by label
    Select {
        /// Select element
        target: Locator,
        /// Option label
        option: String,
    },
    /// Capture an element's trimmed text
    ReadText {
        /// Element
        target: Locator,
        /// Capture key
        capture: String,
    },
    /// Capture an element's attribute (empty if absent)
    ReadAttribute {
        /// Element
        target: Locator,
        /// Attribute name
        attribute: String,
        /// Capture key
        capture: String,
    },
    /// Subject equals expected
    AssertEquals {
        /// Observed value
        subject: Subject,
        /// Expected value
        expected: Expected,
    },
    /// Subject contains expected as a substring
    AssertContains {
        /// Observed value
        subject: Subject,
        /// Expected substring
        expected: Expected,
    },
    /// Subject is not empty
    AssertNotEmpty {
        /// Observed value
        subject: Subject,
    },
    /// Element is visible
    AssertVisible {
        /// Element
        target: Locator,
    },
    /// More than `threshold` elements match
    AssertCountAbove {
        /// Selector to count
        selector: String,
        /// Exclusive lower bound
        threshold: usize,
    },
    /// Exactly `count` elements match
    AssertCountEquals {
        /// Selector to count
        selector: String,
        /// Expected count
        count: usize,
    },
    /// Texts of all matches are in the given order
    AssertOrdered {
        /// Selector of the labels
        selector: String,
        /// Required order
        order: SortOrder,
    },
    /// Run nested steps once per match of `selector`
    ForEach {
        /// Selector to iterate
        selector: String,
        /// Steps run per match, with `index`/`ordinal` bound
        steps: Vec<Step>,
    },
}

impl Step {
    /// Navigate to `url`
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate { url: url.into() }
    }

    /// Wait for `target`
    #[must_use]
    pub fn locate(target: impl Into<Locator>) -> Self {
        Self::Locate {
            target: target.into(),
        }
    }

    /// Type `text` into `target`
    #[must_use]
    pub fn type_text(target: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self::Type {
            target: target.into(),
            text: text.into(),
        }
    }

    /// Click `target`
    #[must_use]
    pub fn click(target: impl Into<Locator>) -> Self {
        Self::Click {
            target: target.into(),
        }
    }

    /// Select `option` in `target`
    #[must_use]
    pub fn select(target: impl Into<Locator>, option: impl Into<String>) -> Self {
        Self::Select {
            target: target.into(),
            option: option.into(),
        }
    }

    /// Capture the text of `target` under `key`
    #[must_use]
    pub fn read_text(target: impl Into<Locator>, key: impl Into<String>) -> Self {
        Self::ReadText {
            target: target.into(),
            capture: key.into(),
        }
    }

    /// Assert the current URL equals `url`
    #[must_use]
    pub fn assert_url(url: impl Into<String>) -> Self {
        Self::AssertEquals {
            subject: Subject::Url,
            expected: Expected::literal(url),
        }
    }

    /// Assert the text of `target` equals `expected`
    #[must_use]
    pub fn assert_text(target: impl Into<Locator>, expected: Expected) -> Self {
        Self::AssertEquals {
            subject: Subject::Text(target.into()),
            expected,
        }
    }

    /// Assert `target` is visible
    #[must_use]
    pub fn assert_visible(target: impl Into<Locator>) -> Self {
        Self::AssertVisible {
            target: target.into(),
        }
    }

    /// Run `steps` for every match of `selector`
    #[must_use]
    pub fn for_each(selector: impl Into<String>, steps: Vec<Self>) -> Self {
        Self::ForEach {
            selector: selector.into(),
            steps,
        }
    }

    /// Whether this step only observes the page
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(
            self,
            Self::AssertEquals { .. }
                | Self::AssertContains { .. }
                | Self::AssertNotEmpty { .. }
                | Self::AssertVisible { .. }
                | Self::AssertCountAbove { .. }
                | Self::AssertCountEquals { .. }
                | Self::AssertOrdered { .. }
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate to {url}"),
            Self::GoBack => f.write_str("go back"),
            Self::Locate { target } => write!(f, "locate {target}"),
            Self::Type { target, text } => write!(f, "type {text:?} into {target}"),
            Self::Click { target } => write!(f, "click {target}"),
            Self::Select { target, option } => write!(f, "select {option:?} in {target}"),
            Self::ReadText { target, capture } => {
                write!(f, "read text of {target} as {capture}")
            }
            Self::ReadAttribute {
                target,
                attribute,
                capture,
            } => write!(f, "read {attribute} of {target} as {capture}"),
            Self::AssertEquals { subject, expected } => {
                write!(f, "assert {subject} equals {expected}")
            }
            Self::AssertContains { subject, expected } => {
                write!(f, "assert {subject} contains {expected}")
            }
            Self::AssertNotEmpty { subject } => write!(f, "assert {subject} is not empty"),
            Self::AssertVisible { target } => write!(f, "assert {target} is visible"),
            Self::AssertCountAbove {
                selector,
                threshold,
            } => write!(f, "assert count of {selector} above {threshold}"),
            Self::AssertCountEquals { selector, count } => {
                write!(f, "assert count of {selector} equals {count}")
            }
            Self::AssertOrdered { selector, order } => {
                write!(f, "assert {selector} in {order} order")
            }
            Self::ForEach { selector, .. } => write!(f, "for each {selector}"),
        }
    }
}
