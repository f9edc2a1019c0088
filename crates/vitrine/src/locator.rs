//! Locator abstraction for element selection.
//!
//! A locator is a selector plus an optional index. It is resolved against the
//! live page on every step and never cached; resolution auto-waits until the
//! requested match exists (and, for actions, is actionable) or the deadline
//! elapses.

use crate::context::Context;
use crate::driver::{Driver, ElementHandle};
use crate::result::{VitrineError, VitrineResult};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index qualifier of a locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Index {
    /// Fixed position among the matches
    At(usize),
    /// Position taken from a loop binding, e.g. `"{index}"`
    Placeholder(String),
}

/// Selector plus optional index, as written in a step.
///
/// Deserializes from either a bare selector string or a
/// `{selector, index}` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocatorRepr")]
pub struct Locator {
    /// CSS selector (may contain `{binding}` placeholders)
    pub selector: String,
    /// Which match to use; the first one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Index>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Bare(String),
    Full {
        selector: String,
        #[serde(default)]
        index: Option<Index>,
    },
}

impl From<LocatorRepr> for Locator {
    fn from(repr: LocatorRepr) -> Self {
        match repr {
            LocatorRepr::Bare(selector) => Self::new(selector),
            LocatorRepr::Full { selector, index } => Self { selector, index },
        }
    }
}

impl Locator {
    /// Create a locator for the first match of `selector`
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            index: None,
        }
    }

    /// Use the `index`-th match
    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(Index::At(index));
        self
    }

    /// Use the match at the current `ForEach` index
    #[must_use]
    pub fn each(mut self) -> Self {
        self.index = Some(Index::Placeholder("{index}".to_string()));
        self
    }

    /// Substitute loop bindings into selector and index
    pub fn resolve(&self, ctx: &Context) -> VitrineResult<Target> {
        let selector = ctx.expand(&self.selector)?;
        let index = match &self.index {
            None => None,
            Some(Index::At(i)) => Some(*i),
            Some(Index::Placeholder(raw)) => {
                let expanded = ctx.expand(raw)?;
                let parsed = expanded.trim().parse::<usize>().map_err(|_| {
                    VitrineError::invalid_step(format!(
                        "index {raw:?} expanded to {expanded:?}, not a number"
                    ))
                })?;
                Some(parsed)
            }
        };
        Ok(Target { selector, index })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.index {
            None => write!(f, "{}", self.selector),
            Some(Index::At(i)) => write!(f, "{}[{i}]", self.selector),
            Some(Index::Placeholder(p)) => write!(f, "{}[{p}]", self.selector),
        }
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

/// A locator with all bindings substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Concrete selector
    pub selector: String,
    /// Concrete index
    pub index: Option<usize>,
}

impl Target {
    pub(crate) fn pick(&self, mut found: Vec<ElementHandle>) -> Option<ElementHandle> {
        let i = self.index.unwrap_or(0);
        if i < found.len() {
            Some(found.swap_remove(i))
        } else {
            None
        }
    }

    pub(crate) fn not_found(&self, options: &WaitOptions) -> VitrineError {
        VitrineError::ElementNotFound {
            selector: self.selector.clone(),
            index: self.index,
            timeout_ms: options.timeout_ms,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{i}]", self.selector),
            None => write!(f, "{}", self.selector),
        }
    }
}

/// What an action needs from the element it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actionability {
    /// Visible and enabled
    Clickable,
    /// Visible, enabled and accepting text
    Editable,
    /// A visible selection control
    Selectable,
}

impl Actionability {
    /// Why `element` cannot take the action, if it cannot
    #[must_use]
    pub fn refusal(self, element: &ElementHandle) -> Option<String> {
        if !element.visible {
            return Some("element is hidden".to_string());
        }
        if !element.enabled {
            return Some("element is disabled".to_string());
        }
        match self {
            Self::Clickable => None,
            Self::Editable if !element.editable => {
                Some(format!("<{}> is not an editable input", element.tag_name))
            }
            Self::Selectable if !element.is_select() => {
                Some(format!("<{}> is not a selection control", element.tag_name))
            }
            Self::Editable | Self::Selectable => None,
        }
    }
}

/// Poll until the target element exists.
pub async fn locate(
    driver: &dyn Driver,
    target: &Target,
    options: &WaitOptions,
) -> VitrineResult<ElementHandle> {
    let mut deadline = options.deadline();
    loop {
        let found = driver.query(&target.selector).await?;
        if let Some(element) = target.pick(found) {
            tracing::debug!(
                selector = %target.selector,
                polls = deadline.polls(),
                "located"
            );
            return Ok(element);
        }
        if !deadline.next_poll().await {
            return Err(target.not_found(options));
        }
    }
}

/// Poll until the target element exists and can take the action.
///
/// Fails with `NotInteractable` if the element showed up but never became
/// actionable, `ElementNotFound` if it never showed up.
pub async fn locate_actionable(
    driver: &dyn Driver,
    target: &Target,
    options: &WaitOptions,
    needs: Actionability,
) -> VitrineResult<ElementHandle> {
    let mut deadline = options.deadline();
    let mut refusal = None;
    loop {
        let found = driver.query(&target.selector).await?;
        if let Some(element) = target.pick(found) {
            match needs.refusal(&element) {
                None => return Ok(element),
                Some(reason) => refusal = Some(reason),
            }
        }
        if !deadline.next_poll().await {
            return Err(match refusal {
                Some(reason) => VitrineError::NotInteractable {
                    selector: target.to_string(),
                    reason,
                },
                None => target.not_found(options),
            });
        }
    }
}

/// Poll until at least one element matches, then return all matches.
pub async fn locate_all(
    driver: &dyn Driver,
    selector: &str,
    options: &WaitOptions,
) -> VitrineResult<Vec<ElementHandle>> {
    let mut deadline = options.deadline();
    loop {
        let found = driver.query(selector).await?;
        if !found.is_empty() {
            return Ok(found);
        }
        if !deadline.next_poll().await {
            return Err(VitrineError::ElementNotFound {
                selector: selector.to_string(),
                index: None,
                timeout_ms: options.timeout_ms,
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockElement};

    fn fast() -> WaitOptions {
        WaitOptions::new().with_timeout(60).with_poll_interval(5)
    }

    async fn page(elements: Vec<MockElement>) -> MockDriver {
        let mut driver = MockDriver::new().page("p", elements);
        driver.navigate("p").await.unwrap();
        driver
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_fixed_index() {
            let target = Locator::new(".item").nth(2).resolve(&Context::new()).unwrap();
            assert_eq!(target.index, Some(2));
            assert_eq!(target.to_string(), ".item[2]");
        }

        #[test]
        fn test_placeholder_index_uses_binding() {
            let mut ctx = Context::new();
            ctx.bind("index", 3);
            let target = Locator::new(".item").each().resolve(&ctx).unwrap();
            assert_eq!(target.index, Some(3));
        }

        #[test]
        fn test_unbound_placeholder_is_invalid() {
            let err = Locator::new(".item").each().resolve(&Context::new()).unwrap_err();
            assert!(matches!(err, VitrineError::InvalidStep { .. }));
        }

        #[test]
        fn test_locator_deserializes_plain_and_placeholder_index() {
            let fixed: Locator = serde_yaml_ng::from_str("selector: a\nindex: 1").unwrap();
            assert_eq!(fixed.index, Some(Index::At(1)));
            let each: Locator = serde_yaml_ng::from_str("selector: a\nindex: '{index}'").unwrap();
            assert_eq!(each.index, Some(Index::Placeholder("{index}".to_string())));
            let bare: Locator = serde_yaml_ng::from_str("'#menu'").unwrap();
            assert_eq!(bare, Locator::new("#menu"));
        }
    }

    mod locate_tests {
        use super::*;

        #[tokio::test]
        async fn test_locate_waits_for_late_element() {
            let driver = page(vec![MockElement::new("#late", "div").appears_after(3)]).await;
            let target = Locator::new("#late").resolve(&Context::new()).unwrap();
            let found = locate(&driver, &target, &fast()).await.unwrap();
            assert_eq!(found.selector, "#late");
        }

        #[tokio::test]
        async fn test_locate_times_out_with_element_not_found() {
            let driver = page(vec![]).await;
            let target = Locator::new("#never").nth(1).resolve(&Context::new()).unwrap();
            let err = locate(&driver, &target, &fast()).await.unwrap_err();
            match err {
                VitrineError::ElementNotFound {
                    selector, index, ..
                } => {
                    assert_eq!(selector, "#never");
                    assert_eq!(index, Some(1));
                }
                other => panic!("unexpected error {other}"),
            }
        }

        #[tokio::test]
        async fn test_index_beyond_matches_is_not_found() {
            let driver = page(vec![MockElement::new(".a", "li")]).await;
            let target = Locator::new(".a").nth(1).resolve(&Context::new()).unwrap();
            assert!(locate(&driver, &target, &fast()).await.is_err());
        }

        #[tokio::test]
        async fn test_hidden_button_is_not_interactable() {
            let driver = page(vec![MockElement::new("#b", "button").hidden()]).await;
            let target = Locator::new("#b").resolve(&Context::new()).unwrap();
            let err = locate_actionable(&driver, &target, &fast(), Actionability::Clickable)
                .await
                .unwrap_err();
            assert!(matches!(err, VitrineError::NotInteractable { .. }));
        }

        #[tokio::test]
        async fn test_typing_into_div_is_not_interactable() {
            let driver = page(vec![MockElement::new("#d", "div")]).await;
            let target = Locator::new("#d").resolve(&Context::new()).unwrap();
            let err = locate_actionable(&driver, &target, &fast(), Actionability::Editable)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("not an editable input"));
        }

        #[tokio::test]
        async fn test_locate_all_returns_every_match() {
            let driver = page(vec![
                MockElement::new(".i", "li"),
                MockElement::new(".i", "li"),
                MockElement::new(".j", "li"),
            ])
            .await;
            assert_eq!(locate_all(&driver, ".i", &fast()).await.unwrap().len(), 2);
        }
    }
}
