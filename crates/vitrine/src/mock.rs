//! In-memory driver for tests.
//!
//! `MockDriver` simulates a small multi-page site: each URL is a route that
//! renders a flat list of elements keyed by selector, click/select reactions
//! mutate the page (or navigate), and elements can be made to appear only
//! after a number of polls to exercise auto-waiting.

use crate::driver::{Driver, DriverFactory, ElementHandle};
use crate::result::{VitrineError, VitrineResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Renders the elements of one URL from the current state
pub type Route = Arc<dyn Fn(&MockState) -> Vec<MockElement> + Send + Sync>;

/// Runs after an element matching its selector is clicked or selected
pub type Reaction = Box<dyn FnMut(&mut MockState, &ElementHandle) + Send>;

/// An element on a simulated page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Selector this element answers to (matched literally)
    pub selector: String,
    /// Tag name
    pub tag_name: String,
    /// Text content
    pub text: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts typed input
    pub editable: bool,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Option labels for selection controls
    pub options: Vec<String>,
    /// Number of queries that will not see this element yet
    pub pending_polls: usize,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            tag_name: tag_name.into(),
            text: String::new(),
            visible: true,
            enabled: true,
            editable: false,
            attributes: BTreeMap::new(),
            options: Vec::new(),
            pending_polls: 0,
        }
    }

    /// An editable text input
    #[must_use]
    pub fn input(selector: impl Into<String>) -> Self {
        let mut element = Self::new(selector, "input");
        element.editable = true;
        element
    }

    /// A selection control with the given option labels
    #[must_use]
    pub fn select<I, S>(selector: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut element = Self::new(selector, "select");
        element.options = options.into_iter().map(Into::into).collect();
        element
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Render hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Render disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Only show up after `polls` queries have missed it
    #[must_use]
    pub const fn appears_after(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    fn handle(&self, index: usize) -> ElementHandle {
        ElementHandle {
            selector: self.selector.clone(),
            index,
            tag_name: self.tag_name.clone(),
            text: self.text.trim().to_string(),
            visible: self.visible,
            enabled: self.enabled,
            editable: self.editable,
            attributes: self.attributes.clone(),
            options: self.options.clone(),
        }
    }
}

/// Page state shared by a `MockDriver` and its reactions
#[derive(Default)]
pub struct MockState {
    url: String,
    elements: Vec<MockElement>,
    history: Vec<String>,
    routes: HashMap<String, Route>,
    calls: Vec<String>,
    closed: bool,
}

impl std::fmt::Debug for MockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockState")
            .field("url", &self.url)
            .field("elements", &self.elements.len())
            .field("history", &self.history)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl MockState {
    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Elements currently rendered
    #[must_use]
    pub fn elements(&self) -> &[MockElement] {
        &self.elements
    }

    /// Visited URLs, oldest first
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Driver calls, in order
    #[must_use]
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Whether the session was closed
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Load `url` as a new history entry
    pub fn visit(&mut self, url: &str) -> VitrineResult<()> {
        self.render_url(url)?;
        self.history.push(url.to_string());
        Ok(())
    }

    /// Re-render the current URL from its route
    pub fn refresh(&mut self) -> VitrineResult<()> {
        let url = self.url.clone();
        self.render_url(&url)
    }

    fn render_url(&mut self, url: &str) -> VitrineResult<()> {
        let route = self
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| VitrineError::Navigation {
                url: url.to_string(),
                message: "no route".to_string(),
            })?;
        self.elements = route(self);
        self.url = url.to_string();
        Ok(())
    }

    /// Mutable access to the `index`-th ready element matching `selector`
    pub fn element_mut(&mut self, selector: &str, index: usize) -> Option<&mut MockElement> {
        self.elements
            .iter_mut()
            .filter(|e| e.selector == selector && e.pending_polls == 0)
            .nth(index)
    }

    /// Attribute of the `index`-th ready element matching `selector`
    #[must_use]
    pub fn attribute(&self, selector: &str, index: usize, name: &str) -> Option<&str> {
        self.elements
            .iter()
            .filter(|e| e.selector == selector && e.pending_polls == 0)
            .nth(index)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    fn require_open(&self) -> VitrineResult<()> {
        if self.closed {
            return Err(VitrineError::driver("session closed"));
        }
        Ok(())
    }
}

/// Mock driver for unit and end-to-end tests.
///
/// Cloning shares the underlying page, so a test can keep a handle for
/// inspection after passing the driver to the runner.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    reactions: Arc<Mutex<Vec<(String, Reaction)>>>,
    navigation_delay: Option<Duration>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver")
            .field("state", &self.state)
            .field("navigation_delay", &self.navigation_delay)
            .finish_non_exhaustive()
    }
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a fixed list of elements at `url`
    #[must_use]
    pub fn page(self, url: impl Into<String>, elements: Vec<MockElement>) -> Self {
        self.route(url, move |_| elements.clone())
    }

    /// Serve elements rendered from the current state at `url`
    #[must_use]
    pub fn route<F>(self, url: impl Into<String>, render: F) -> Self
    where
        F: Fn(&MockState) -> Vec<MockElement> + Send + Sync + 'static,
    {
        if let Ok(mut state) = self.state.lock() {
            state.routes.insert(url.into(), Arc::new(render));
        }
        self
    }

    /// React to clicks or selections on elements matching `selector`
    #[must_use]
    pub fn on<F>(self, selector: impl Into<String>, reaction: F) -> Self
    where
        F: FnMut(&mut MockState, &ElementHandle) + Send + 'static,
    {
        if let Ok(mut reactions) = self.reactions.lock() {
            reactions.push((selector.into(), Box::new(reaction)));
        }
        self
    }

    /// Clicking `selector` loads `url`
    #[must_use]
    pub fn link(self, selector: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        self.on(selector, move |state, _| {
            let _ = state.visit(&url);
        })
    }

    /// Delay every navigation
    #[must_use]
    pub const fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = Some(delay);
        self
    }

    /// Lock the page state for inspection
    pub fn state(&self) -> VitrineResult<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| VitrineError::driver("mock state poisoned"))
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state()
            .map(|s| s.calls.iter().any(|c| c.starts_with(prefix)))
            .unwrap_or(false)
    }

    fn react(&self, element: &ElementHandle) -> VitrineResult<()> {
        let mut reactions = self
            .reactions
            .lock()
            .map_err(|_| VitrineError::driver("mock reactions poisoned"))?;
        let mut state = self.state()?;
        for (selector, reaction) in reactions.iter_mut() {
            if *selector == element.selector {
                reaction(&mut state, element);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&mut self, url: &str) -> VitrineResult<()> {
        if let Some(delay) = self.navigation_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state()?;
        state.require_open()?;
        state.calls.push(format!("navigate:{url}"));
        state.visit(url)
    }

    async fn current_url(&self) -> VitrineResult<String> {
        Ok(self.state()?.url.clone())
    }

    async fn query(&self, selector: &str) -> VitrineResult<Vec<ElementHandle>> {
        let mut state = self.state()?;
        state.require_open()?;
        let mut found = Vec::new();
        for element in state.elements.iter_mut().filter(|e| e.selector == selector) {
            if element.pending_polls > 0 {
                element.pending_polls -= 1;
                continue;
            }
            found.push(element.handle(found.len()));
        }
        Ok(found)
    }

    async fn click(&mut self, element: &ElementHandle) -> VitrineResult<()> {
        {
            let mut state = self.state()?;
            state.require_open()?;
            state
                .calls
                .push(format!("click:{}#{}", element.selector, element.index));
        }
        self.react(element)
    }

    async fn set_value(&mut self, element: &ElementHandle, text: &str) -> VitrineResult<()> {
        let mut state = self.state()?;
        state
            .calls
            .push(format!("type:{}#{}={text}", element.selector, element.index));
        let target = state
            .element_mut(&element.selector, element.index)
            .ok_or_else(|| VitrineError::driver(format!("stale element {}", element.selector)))?;
        target
            .attributes
            .insert("value".to_string(), text.to_string());
        Ok(())
    }

    async fn select_option(&mut self, element: &ElementHandle, label: &str) -> VitrineResult<()> {
        {
            let mut state = self.state()?;
            state
                .calls
                .push(format!("select:{}#{}={label}", element.selector, element.index));
            let target = state
                .element_mut(&element.selector, element.index)
                .ok_or_else(|| {
                    VitrineError::driver(format!("stale element {}", element.selector))
                })?;
            target
                .attributes
                .insert("value".to_string(), label.to_string());
        }
        self.react(element)
    }

    async fn go_back(&mut self) -> VitrineResult<()> {
        let mut state = self.state()?;
        state.calls.push("go_back".to_string());
        if state.history.len() < 2 {
            return Ok(());
        }
        state.history.pop();
        let previous = state.history.last().cloned().unwrap_or_default();
        state.render_url(&previous)
    }

    async fn close(&mut self) -> VitrineResult<()> {
        let mut state = self.state()?;
        state.calls.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

/// Hands out fresh mock sessions and remembers them for inspection
#[derive(Clone)]
pub struct MockFactory {
    build: Arc<dyn Fn() -> MockDriver + Send + Sync>,
    launched: Arc<Mutex<Vec<MockDriver>>>,
    fail_launch: bool,
    launch_delay: Option<Duration>,
}

impl std::fmt::Debug for MockFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFactory")
            .field("fail_launch", &self.fail_launch)
            .field("launch_delay", &self.launch_delay)
            .finish_non_exhaustive()
    }
}

impl MockFactory {
    /// Create a factory that builds each session with `build`
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> MockDriver + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(build),
            launched: Arc::new(Mutex::new(Vec::new())),
            fail_launch: false,
            launch_delay: None,
        }
    }

    /// Make every launch fail
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    /// Take `delay` to start each session, like a cold browser
    #[must_use]
    pub const fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = Some(delay);
        self
    }

    /// Sessions launched so far
    #[must_use]
    pub fn launched(&self) -> Vec<MockDriver> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn launch(&self) -> VitrineResult<Box<dyn Driver>> {
        if let Some(delay) = self.launch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_launch {
            return Err(VitrineError::BrowserLaunch {
                message: "mock launch refused".to_string(),
            });
        }
        let driver = (self.build)();
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(driver.clone());
        }
        Ok(Box::new(driver))
    }
}
