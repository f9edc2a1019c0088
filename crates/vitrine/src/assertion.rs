//! Assertion engine.
//!
//! Assertions never judge a frozen value: the supplier is re-observed on
//! every poll until the expectation holds or the deadline elapses. The last
//! observation is kept for the failure report.

use crate::compare::SortOrder;
use crate::driver::{Driver, ElementHandle};
use crate::locator::Target;
use crate::result::{VitrineError, VitrineResult};
use crate::wait::WaitOptions;
use async_trait::async_trait;
use std::fmt;

/// One observation of an assertion subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actual {
    /// A text value (URL, element text, attribute, capture)
    Text(String),
    /// Number of matching elements
    Count(usize),
    /// Element visibility
    Visible(bool),
    /// Texts of all matching elements, in document order
    Texts(Vec<String>),
    /// The subject element does not exist (yet)
    Missing,
}

impl fmt::Display for Actual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Count(n) => write!(f, "{n}"),
            Self::Visible(true) => f.write_str("visible"),
            Self::Visible(false) => f.write_str("hidden"),
            Self::Texts(items) => write!(f, "[{}]", items.join(", ")),
            Self::Missing => f.write_str("<missing>"),
        }
    }
}

/// Condition an observation must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Text equals
    Equals(String),
    /// Text contains substring
    Contains(String),
    /// Text is not empty
    NotEmpty,
    /// Element is visible
    Visible,
    /// Count strictly above
    CountAbove(usize),
    /// Count equals
    CountEquals(usize),
    /// Texts are in order
    Ordered(SortOrder),
}

impl Expectation {
    /// Check an observation
    #[must_use]
    pub fn matches(&self, actual: &Actual) -> bool {
        match (self, actual) {
            (Self::Equals(expected), Actual::Text(text)) => text == expected,
            (Self::Equals(expected), Actual::Count(n)) => n.to_string() == *expected,
            (Self::Contains(needle), Actual::Text(text)) => text.contains(needle.as_str()),
            (Self::NotEmpty, Actual::Text(text)) => !text.is_empty(),
            (Self::Visible, Actual::Visible(visible)) => *visible,
            (Self::CountAbove(threshold), Actual::Count(n)) => n > threshold,
            (Self::CountEquals(count), Actual::Count(n)) => n == count,
            (Self::Ordered(order), Actual::Texts(items)) => {
                order.first_violation(items).is_none()
            }
            _ => false,
        }
    }

    /// Short verb for the condition, e.g. `equals`
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Equals(_) | Self::CountEquals(_) => "equals",
            Self::Contains(_) => "contains",
            Self::NotEmpty => "is not empty",
            Self::Visible => "is visible",
            Self::CountAbove(_) => "above",
            Self::Ordered(_) => "ordered",
        }
    }

    /// Expected value as reported on failure
    #[must_use]
    pub fn expected(&self) -> String {
        match self {
            Self::Equals(s) | Self::Contains(s) => s.clone(),
            Self::NotEmpty => "non-empty".to_string(),
            Self::Visible => "visible".to_string(),
            Self::CountAbove(n) => format!("more than {n}"),
            Self::CountEquals(n) => n.to_string(),
            Self::Ordered(order) => format!("{order} order"),
        }
    }

    /// Extra detail about a failed observation
    fn detail(&self, actual: &Actual) -> Option<String> {
        match (self, actual) {
            (Self::Ordered(order), Actual::Texts(items)) => {
                order.first_violation(items).map(|v| {
                    format!(
                        "{:?} followed by {:?} at position {}",
                        v.previous, v.current, v.position
                    )
                })
            }
            _ => None,
        }
    }
}

/// Source of fresh observations for an assertion
#[async_trait]
pub trait ActualSupplier: Send + Sync {
    /// Observe the subject now
    async fn observe(&self) -> VitrineResult<Actual>;

    /// What is being observed, for diagnostics
    fn describe(&self) -> String;

    /// Failure to report when the subject never appeared
    fn missing(&self, options: &WaitOptions) -> VitrineError {
        VitrineError::ElementNotFound {
            selector: self.describe(),
            index: None,
            timeout_ms: options.timeout_ms,
        }
    }
}

/// A passed assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertOutcome {
    /// Observation that satisfied the expectation
    pub actual: Actual,
    /// Polls before it did
    pub polls: u32,
}

/// Re-poll `supplier` until `expectation` holds.
///
/// # Errors
///
/// `ElementNotFound` if the subject is still missing at the deadline,
/// `AssertionTimeout` with the last observation otherwise. Errors raised by
/// the supplier itself abort the wait immediately.
pub async fn assert_eventually(
    supplier: &dyn ActualSupplier,
    expectation: &Expectation,
    options: &WaitOptions,
) -> VitrineResult<AssertOutcome> {
    let mut deadline = options.deadline();
    loop {
        let actual = supplier.observe().await?;
        if expectation.matches(&actual) {
            return Ok(AssertOutcome {
                actual,
                polls: deadline.polls(),
            });
        }
        if !deadline.next_poll().await {
            if actual == Actual::Missing {
                return Err(supplier.missing(options));
            }
            let mut condition = format!("{} {}", supplier.describe(), expectation.verb());
            if let Some(detail) = expectation.detail(&actual) {
                condition.push_str(" (");
                condition.push_str(&detail);
                condition.push(')');
            }
            tracing::debug!(condition = %condition, actual = %actual, "assertion timed out");
            return Err(VitrineError::AssertionTimeout {
                condition,
                actual: actual.to_string(),
                expected: expectation.expected(),
                timeout_ms: options.timeout_ms,
            });
        }
    }
}

/// What to read from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Current URL
    Url,
    /// Text of an element
    Text(Target),
    /// Attribute of an element
    Attribute(Target, String),
    /// Visibility of an element
    Visibility(Target),
    /// Number of matches
    Count(String),
    /// Texts of all matches
    Texts(String),
    /// A fixed value (a resolved capture)
    Fixed {
        /// Capture key, for diagnostics
        key: String,
        /// Captured value
        value: String,
    },
}

/// Supplier reading a live page through a driver
pub struct PageProbe<'a> {
    driver: &'a dyn Driver,
    probe: Probe,
}

impl fmt::Debug for PageProbe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageProbe")
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

impl<'a> PageProbe<'a> {
    /// Probe `driver` for `probe`
    #[must_use]
    pub fn new(driver: &'a dyn Driver, probe: Probe) -> Self {
        Self { driver, probe }
    }

    async fn element(&self, target: &Target) -> VitrineResult<Option<ElementHandle>> {
        let mut found = self.driver.query(&target.selector).await?;
        let i = target.index.unwrap_or(0);
        Ok((i < found.len()).then(|| found.swap_remove(i)))
    }
}

#[async_trait]
impl ActualSupplier for PageProbe<'_> {
    async fn observe(&self) -> VitrineResult<Actual> {
        Ok(match &self.probe {
            Probe::Url => Actual::Text(self.driver.current_url().await?),
            Probe::Text(target) => self
                .element(target)
                .await?
                .map_or(Actual::Missing, |e| Actual::Text(e.text().to_string())),
            Probe::Attribute(target, name) => self
                .element(target)
                .await?
                .map_or(Actual::Missing, |e| Actual::Text(e.attribute(name).to_string())),
            Probe::Visibility(target) => self
                .element(target)
                .await?
                .map_or(Actual::Missing, |e| Actual::Visible(e.is_visible())),
            Probe::Count(selector) => Actual::Count(self.driver.query(selector).await?.len()),
            Probe::Texts(selector) => {
                let found = self.driver.query(selector).await?;
                if found.is_empty() {
                    Actual::Missing
                } else {
                    Actual::Texts(found.iter().map(|e| e.text().to_string()).collect())
                }
            }
            Probe::Fixed { value, .. } => Actual::Text(value.clone()),
        })
    }

    fn describe(&self) -> String {
        match &self.probe {
            Probe::Url => "url".to_string(),
            Probe::Text(target) => format!("text of {target}"),
            Probe::Attribute(target, name) => format!("{name} of {target}"),
            Probe::Visibility(target) => target.to_string(),
            Probe::Count(selector) => format!("count of {selector}"),
            Probe::Texts(selector) => format!("texts of {selector}"),
            Probe::Fixed { key, .. } => format!("captured {key}"),
        }
    }

    fn missing(&self, options: &WaitOptions) -> VitrineError {
        let (selector, index) = match &self.probe {
            Probe::Text(t) | Probe::Attribute(t, _) | Probe::Visibility(t) => {
                (t.selector.clone(), t.index)
            }
            Probe::Count(s) | Probe::Texts(s) => (s.clone(), None),
            Probe::Url | Probe::Fixed { .. } => (self.describe(), None),
        };
        VitrineError::ElementNotFound {
            selector,
            index,
            timeout_ms: options.timeout_ms,
        }
    }
}
