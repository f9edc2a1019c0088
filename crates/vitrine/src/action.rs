//! Action executor.
//!
//! Runs one [`Step`] against a live session. Every element lookup re-queries
//! the page and polls within the per-action deadline; navigation has its own
//! longer bound.

use crate::assertion::{assert_eventually, Actual, Expectation, PageProbe, Probe};
use crate::context::Context;
use crate::driver::{Driver, ElementHandle};
use crate::locator::{locate, locate_actionable, locate_all, Actionability, Target};
use crate::result::{VitrineError, VitrineResult};
use crate::step::{Expected, Step, Subject};
use crate::wait::{WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS};
use futures::future::BoxFuture;
use std::fmt;
use std::time::{Duration, Instant};

/// What a successful step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action was performed
    Done,
    /// An element was located
    Located(ElementHandle),
    /// A value was captured
    Captured {
        /// Capture key (placeholders expanded)
        key: String,
        /// Captured value
        value: String,
    },
    /// An assertion held
    Asserted(Actual),
    /// A loop ran this many iterations
    Iterated(usize),
}

/// A step that failed, with the error that stopped it
#[derive(Debug)]
pub struct StepFailure {
    /// Description of the failing step (with loop path, if any)
    pub step: String,
    /// Cause
    pub error: VitrineError,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.error)
    }
}

impl std::error::Error for StepFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Executes steps with auto-waiting
#[derive(Debug, Clone, Copy)]
pub struct ActionExecutor {
    wait: WaitOptions,
    navigation_timeout: Duration,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(WaitOptions::default())
    }
}

impl ActionExecutor {
    /// Create an executor polling with `wait`
    #[must_use]
    pub const fn new(wait: WaitOptions) -> Self {
        Self {
            wait,
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    /// Bound page loads by `timeout`
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Polling options in use
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// Execute `step`, recording captures in `ctx`.
    pub fn execute<'a>(
        &'a self,
        step: &'a Step,
        driver: &'a mut dyn Driver,
        ctx: &'a mut Context,
    ) -> BoxFuture<'a, Result<ActionOutcome, StepFailure>> {
        Box::pin(async move {
            let started = Instant::now();
            let outcome = match step {
                Step::ForEach { selector, steps } => {
                    self.for_each(selector, steps, driver, ctx).await
                }
                _ => self.perform(step, driver, ctx).await.map_err(|error| StepFailure {
                    step: step.to_string(),
                    error,
                }),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(_) => tracing::debug!(step = %step, elapsed_ms, "step passed"),
                Err(failure) => tracing::debug!(
                    step = %failure.step,
                    elapsed_ms,
                    error = %failure.error,
                    "step failed"
                ),
            }
            outcome
        })
    }

    async fn for_each(
        &self,
        selector: &str,
        steps: &[Step],
        driver: &mut dyn Driver,
        ctx: &mut Context,
    ) -> Result<ActionOutcome, StepFailure> {
        let header = format!("for each {selector}");
        let resolved = ctx.expand(selector).map_err(|error| StepFailure {
            step: header.clone(),
            error,
        })?;
        let count = locate_all(&*driver, &resolved, &self.wait)
            .await
            .map_err(|error| StepFailure {
                step: header.clone(),
                error,
            })?
            .len();

        let outer = (ctx.binding("index"), ctx.binding("ordinal"));
        let mut result = Ok(ActionOutcome::Iterated(count));
        'items: for index in 0..count {
            ctx.bind("index", index);
            ctx.bind("ordinal", index + 1);
            for inner in steps {
                if let Err(failure) = self.execute(inner, &mut *driver, &mut *ctx).await {
                    result = Err(StepFailure {
                        step: format!("{header} #{} > {}", index + 1, failure.step),
                        error: failure.error,
                    });
                    break 'items;
                }
            }
        }
        restore(ctx, "index", outer.0);
        restore(ctx, "ordinal", outer.1);
        result
    }

    async fn perform(
        &self,
        step: &Step,
        driver: &mut dyn Driver,
        ctx: &mut Context,
    ) -> VitrineResult<ActionOutcome> {
        match step {
            Step::Navigate { url } => {
                let url = ctx.expand(url)?;
                self.navigate(driver, &url).await?;
                Ok(ActionOutcome::Done)
            }
            Step::GoBack => {
                driver.go_back().await?;
                Ok(ActionOutcome::Done)
            }
            Step::Locate { target } => {
                let target = target.resolve(ctx)?;
                let element = locate(&*driver, &target, &self.wait).await?;
                Ok(ActionOutcome::Located(element))
            }
            Step::Type { target, text } => {
                let target = target.resolve(ctx)?;
                let text = ctx.expand(text)?;
                let element =
                    locate_actionable(&*driver, &target, &self.wait, Actionability::Editable)
                        .await?;
                driver.set_value(&element, &text).await?;
                Ok(ActionOutcome::Done)
            }
            Step::Click { target } => {
                let target = target.resolve(ctx)?;
                let element =
                    locate_actionable(&*driver, &target, &self.wait, Actionability::Clickable)
                        .await?;
                driver.click(&element).await?;
                Ok(ActionOutcome::Done)
            }
            Step::Select { target, option } => {
                let target = target.resolve(ctx)?;
                let option = ctx.expand(option)?;
                let element = self.option_ready(&*driver, &target, &option).await?;
                driver.select_option(&element, &option).await?;
                Ok(ActionOutcome::Done)
            }
            Step::ReadText { target, capture } => {
                let target = target.resolve(ctx)?;
                let key = ctx.expand(capture)?;
                let element = locate(&*driver, &target, &self.wait).await?;
                let value = element.text().to_string();
                ctx.capture(key.clone(), value.clone());
                Ok(ActionOutcome::Captured { key, value })
            }
            Step::ReadAttribute {
                target,
                attribute,
                capture,
            } => {
                let target = target.resolve(ctx)?;
                let key = ctx.expand(capture)?;
                let element = locate(&*driver, &target, &self.wait).await?;
                let value = element.attribute(attribute).to_string();
                ctx.capture(key.clone(), value.clone());
                Ok(ActionOutcome::Captured { key, value })
            }
            Step::AssertEquals { subject, expected } => {
                let expectation = Expectation::Equals(resolve_expected(expected, ctx)?);
                self.check(&*driver, subject_probe(subject, ctx)?, &expectation)
                    .await
            }
            Step::AssertContains { subject, expected } => {
                let expectation = Expectation::Contains(resolve_expected(expected, ctx)?);
                self.check(&*driver, subject_probe(subject, ctx)?, &expectation)
                    .await
            }
            Step::AssertNotEmpty { subject } => {
                self.check(&*driver, subject_probe(subject, ctx)?, &Expectation::NotEmpty)
                    .await
            }
            Step::AssertVisible { target } => {
                let probe = Probe::Visibility(target.resolve(ctx)?);
                self.check(&*driver, probe, &Expectation::Visible).await
            }
            Step::AssertCountAbove {
                selector,
                threshold,
            } => {
                let probe = Probe::Count(ctx.expand(selector)?);
                self.check(&*driver, probe, &Expectation::CountAbove(*threshold))
                    .await
            }
            Step::AssertCountEquals { selector, count } => {
                let probe = Probe::Count(ctx.expand(selector)?);
                self.check(&*driver, probe, &Expectation::CountEquals(*count))
                    .await
            }
            Step::AssertOrdered { selector, order } => {
                let probe = Probe::Texts(ctx.expand(selector)?);
                self.check(&*driver, probe, &Expectation::Ordered(*order))
                    .await
            }
            Step::ForEach { .. } => Err(VitrineError::invalid_step(
                "nested loop reached the single-step path",
            )),
        }
    }

    async fn navigate(&self, driver: &mut dyn Driver, url: &str) -> VitrineResult<()> {
        match tokio::time::timeout(self.navigation_timeout, driver.navigate(url)).await {
            Ok(result) => result.map_err(|err| match err {
                VitrineError::Navigation { .. } => err,
                other => VitrineError::Navigation {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            }),
            Err(_) => Err(VitrineError::Navigation {
                url: url.to_string(),
                message: format!(
                    "load did not complete within {}ms",
                    self.navigation_timeout.as_millis()
                ),
            }),
        }
    }

    /// Wait for a selection control that offers `option`.
    ///
    /// Actionability and the option share one deadline.
    async fn option_ready(
        &self,
        driver: &dyn Driver,
        target: &Target,
        option: &str,
    ) -> VitrineResult<ElementHandle> {
        let mut deadline = self.wait.deadline();
        let mut refusal = None;
        let mut offered = None;
        loop {
            let found = driver.query(&target.selector).await?;
            if let Some(element) = target.pick(found) {
                match Actionability::Selectable.refusal(&element) {
                    Some(reason) => refusal = Some(reason),
                    None if element.options.iter().any(|o| o == option) => return Ok(element),
                    None => offered = Some(element.options),
                }
            }
            if !deadline.next_poll().await {
                return Err(match (offered, refusal) {
                    (Some(available), _) => VitrineError::OptionNotFound {
                        selector: target.to_string(),
                        option: option.to_string(),
                        available,
                    },
                    (None, Some(reason)) => VitrineError::NotInteractable {
                        selector: target.to_string(),
                        reason,
                    },
                    (None, None) => target.not_found(&self.wait),
                });
            }
        }
    }

    async fn check(
        &self,
        driver: &dyn Driver,
        probe: Probe,
        expectation: &Expectation,
    ) -> VitrineResult<ActionOutcome> {
        let supplier = PageProbe::new(driver, probe);
        let outcome = assert_eventually(&supplier, expectation, &self.wait).await?;
        Ok(ActionOutcome::Asserted(outcome.actual))
    }
}

fn restore(ctx: &mut Context, name: &str, value: Option<usize>) {
    match value {
        Some(v) => ctx.bind(name, v),
        None => ctx.unbind(name),
    }
}

fn resolve_expected(expected: &Expected, ctx: &Context) -> VitrineResult<String> {
    match expected {
        Expected::Literal(value) => ctx.expand(value),
        Expected::Recall { recall } => Ok(ctx.recall(&ctx.expand(recall)?)?.to_string()),
    }
}

fn subject_probe(subject: &Subject, ctx: &Context) -> VitrineResult<Probe> {
    Ok(match subject {
        Subject::Url => Probe::Url,
        Subject::Text(target) => Probe::Text(target.resolve(ctx)?),
        Subject::Attribute { target, name } => Probe::Attribute(target.resolve(ctx)?, name.clone()),
        Subject::Captured(key) => {
            let key = ctx.expand(key)?;
            let value = ctx.recall(&key)?.to_string();
            Probe::Fixed { key, value }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::compare::SortOrder;
    use crate::locator::Locator;
    use crate::mock::{MockDriver, MockElement, MockState};

    const HOME: &str = "https://shop.test/";
    const NEXT: &str = "https://shop.test/next";

    fn executor() -> ActionExecutor {
        ActionExecutor::new(WaitOptions::new().with_timeout(80).with_poll_interval(5))
    }

    fn badge(state: &MockState) -> Vec<MockElement> {
        let clicks = state
            .calls()
            .iter()
            .filter(|c| c.starts_with("click:.item button"))
            .count();
        let mut page = vec![
            MockElement::new(".item", "div"),
            MockElement::new(".item", "div"),
            MockElement::new(".item", "div"),
            MockElement::new(".item button", "button").with_text("Add"),
            MockElement::new(".item button", "button").with_text("Add"),
            MockElement::new(".item button", "button").with_text("Add"),
            MockElement::new(".name", "div").with_text("Zeta"),
            MockElement::new(".name", "div").with_text("Beta"),
            MockElement::new(".name", "div").with_text("Alpha"),
            MockElement::input("#user"),
            MockElement::select("#sort", ["Name (A to Z)", "Name (Z to A)"]),
            MockElement::new("#go", "button"),
            MockElement::new("#off", "button").disabled(),
        ];
        if clicks > 0 {
            page.push(MockElement::new(".badge", "span").with_text(clicks.to_string()));
        }
        page
    }

    async fn driver() -> MockDriver {
        let mut driver = MockDriver::new()
            .route(HOME, badge)
            .page(NEXT, vec![MockElement::new("h1", "h1").with_text("Next")])
            .link("#go", NEXT)
            .on(".item button", |state, _| {
                let _ = state.refresh();
            });
        driver.navigate(HOME).await.unwrap();
        driver
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_type_then_read_back() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            executor()
                .execute(&Step::type_text("#user", "standard_user"), &mut driver, &mut ctx)
                .await
                .unwrap();
            let state = driver.state().unwrap();
            assert_eq!(state.attribute("#user", 0, "value"), Some("standard_user"));
        }

        #[tokio::test]
        async fn test_escaped_braces_are_typed_verbatim() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let step = Step::type_text("#user", crate::context::escape_placeholders("p{word}1"));
            executor().execute(&step, &mut driver, &mut ctx).await.unwrap();
            let state = driver.state().unwrap();
            assert_eq!(state.attribute("#user", 0, "value"), Some("p{word}1"));
        }

        #[tokio::test]
        async fn test_click_disabled_is_not_interactable() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let failure = executor()
                .execute(&Step::click("#off"), &mut driver, &mut ctx)
                .await
                .unwrap_err();
            assert_eq!(failure.step, "click #off");
            assert!(matches!(failure.error, VitrineError::NotInteractable { .. }));
        }

        #[tokio::test]
        async fn test_select_unknown_option() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let failure = executor()
                .execute(&Step::select("#sort", "Price (low to high)"), &mut driver, &mut ctx)
                .await
                .unwrap_err();
            match failure.error {
                VitrineError::OptionNotFound { available, .. } => assert_eq!(available.len(), 2),
                other => panic!("unexpected error {other}"),
            }
        }

        #[tokio::test]
        async fn test_capture_survives_navigation() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let exec = executor();
            let outcome = exec
                .execute(&Step::read_text(Locator::new(".name").nth(2), "first"), &mut driver, &mut ctx)
                .await
                .unwrap();
            assert_eq!(
                outcome,
                ActionOutcome::Captured {
                    key: "first".to_string(),
                    value: "Alpha".to_string()
                }
            );
            exec.execute(&Step::click("#go"), &mut driver, &mut ctx)
                .await
                .unwrap();
            exec.execute(&Step::assert_url(NEXT), &mut driver, &mut ctx)
                .await
                .unwrap();
            assert_eq!(ctx.recall("first").unwrap(), "Alpha");
        }

        #[tokio::test]
        async fn test_recall_of_unknown_key_fails_without_polling() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let step = Step::assert_text(".name", Expected::recall("never"));
            let failure = executor()
                .execute(&step, &mut driver, &mut ctx)
                .await
                .unwrap_err();
            assert!(matches!(failure.error, VitrineError::MissingCapture { .. }));
        }

        #[tokio::test]
        async fn test_ordered_assertion() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let exec = executor();
            let desc = Step::AssertOrdered {
                selector: ".name".to_string(),
                order: SortOrder::Descending,
            };
            assert!(exec.execute(&desc, &mut driver, &mut ctx).await.is_ok());
            let asc = Step::AssertOrdered {
                selector: ".name".to_string(),
                order: SortOrder::Ascending,
            };
            let failure = exec.execute(&asc, &mut driver, &mut ctx).await.unwrap_err();
            assert_eq!(failure.error.expected(), Some("ascending order"));
        }

        #[tokio::test]
        async fn test_navigation_timeout() {
            let mut driver = MockDriver::new()
                .page(HOME, vec![])
                .with_navigation_delay(Duration::from_millis(200));
            let exec = executor().with_navigation_timeout(Duration::from_millis(20));
            let failure = exec
                .execute(&Step::navigate(HOME), &mut driver, &mut Context::new())
                .await
                .unwrap_err();
            assert!(matches!(failure.error, VitrineError::Navigation { .. }));
        }
    }

    /// Offers a selection control once, then only a disabled one
    #[derive(Default)]
    struct FlappingSelect {
        queries: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Driver for FlappingSelect {
        async fn navigate(&mut self, _url: &str) -> VitrineResult<()> {
            Ok(())
        }

        async fn current_url(&self) -> VitrineResult<String> {
            Ok(HOME.to_string())
        }

        async fn query(&self, selector: &str) -> VitrineResult<Vec<ElementHandle>> {
            let seen = self
                .queries
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let mut select = ElementHandle::new(selector, 0, "select");
            select.visible = true;
            select.enabled = seen == 0;
            select.options = vec!["Name (A to Z)".to_string()];
            Ok(vec![select])
        }

        async fn click(&mut self, _element: &ElementHandle) -> VitrineResult<()> {
            Ok(())
        }

        async fn set_value(&mut self, _element: &ElementHandle, _text: &str) -> VitrineResult<()> {
            Ok(())
        }

        async fn select_option(&mut self, _element: &ElementHandle, _label: &str) -> VitrineResult<()> {
            Ok(())
        }

        async fn go_back(&mut self) -> VitrineResult<()> {
            Ok(())
        }

        async fn close(&mut self) -> VitrineResult<()> {
            Ok(())
        }
    }

    mod select_tests {
        use super::*;

        #[tokio::test]
        async fn test_select_waits_one_deadline() {
            let mut driver = FlappingSelect::default();
            let exec =
                ActionExecutor::new(WaitOptions::new().with_timeout(200).with_poll_interval(5));
            let started = Instant::now();
            let failure = exec
                .execute(&Step::select("#sort", "Name (Z to A)"), &mut driver, &mut Context::new())
                .await
                .unwrap_err();
            assert!(started.elapsed() < Duration::from_millis(350));
            match failure.error {
                VitrineError::OptionNotFound { available, .. } => {
                    assert_eq!(available, vec!["Name (A to Z)".to_string()]);
                }
                other => panic!("unexpected error {other}"),
            }
        }

        #[tokio::test]
        async fn test_select_missing_control_is_not_found() {
            let mut driver = driver().await;
            let exec = executor();
            let failure = exec
                .execute(&Step::select("#absent", "x"), &mut driver, &mut Context::new())
                .await
                .unwrap_err();
            assert!(matches!(failure.error, VitrineError::ElementNotFound { .. }));
        }
    }

    mod for_each_tests {
        use super::*;

        #[tokio::test]
        async fn test_badge_follows_each_click() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let step = Step::for_each(
                ".item",
                vec![
                    Step::click(Locator::new(".item button").each()),
                    Step::assert_text(".badge", Expected::literal("{ordinal}")),
                ],
            );
            let outcome = executor()
                .execute(&step, &mut driver, &mut ctx)
                .await
                .unwrap();
            assert_eq!(outcome, ActionOutcome::Iterated(3));
            assert!(driver.was_called("click:.item button#2"));
            assert!(ctx.binding("index").is_none());
        }

        #[tokio::test]
        async fn test_failure_reports_iteration_path() {
            let mut driver = driver().await;
            let mut ctx = Context::new();
            let step = Step::for_each(
                ".item",
                vec![Step::assert_text(
                    Locator::new(".name").each(),
                    Expected::literal("Zeta"),
                )],
            );
            let failure = executor()
                .execute(&step, &mut driver, &mut ctx)
                .await
                .unwrap_err();
            assert!(failure.step.starts_with("for each .item #2 > assert text of .name[{index}]"));
            assert_eq!(failure.error.actual(), Some("Beta"));
        }

        #[tokio::test]
        async fn test_loop_over_nothing_is_not_found() {
            let mut driver = driver().await;
            let step = Step::for_each(".absent", vec![Step::GoBack]);
            let failure = executor()
                .execute(&step, &mut driver, &mut Context::new())
                .await
                .unwrap_err();
            assert_eq!(failure.step, "for each .absent");
            assert!(matches!(failure.error, VitrineError::ElementNotFound { .. }));
        }
    }
}
