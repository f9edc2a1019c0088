//! Chromium sessions over CDP.
//!
//! Every query evaluates one script that snapshots all matches of a selector,
//! so visibility, text, attributes and options are read atomically. Actions
//! re-find their element by selector and index inside the page.

use crate::driver::{Driver, DriverConfig, DriverFactory, ElementHandle};
use crate::result::{VitrineError, VitrineResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const SNAPSHOT_JS: &str = r"(sel) => Array.from(document.querySelectorAll(sel)).map((el, index) => {
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  const tag = el.tagName.toLowerCase();
  const attributes = {};
  for (const a of el.attributes) attributes[a.name] = a.value;
  if (typeof el.value === 'string') attributes.value = el.value;
  return {
    selector: sel,
    index,
    tag_name: tag,
    text: (el.innerText ?? el.textContent ?? '').trim(),
    visible: style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0,
    enabled: !el.disabled,
    editable: (tag === 'input' || tag === 'textarea') && !el.readOnly,
    attributes,
    options: tag === 'select' ? Array.from(el.options).map(o => o.label.trim()) : [],
  };
})";

const CLICK_JS: &str = r"(sel, i) => {
  const el = document.querySelectorAll(sel)[i];
  if (!el) return false;
  el.scrollIntoView({ block: 'center' });
  el.click();
  return true;
}";

const SET_VALUE_JS: &str = r"(sel, i, value) => {
  const el = document.querySelectorAll(sel)[i];
  if (!el) return false;
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
  el.focus();
  setter.call(el, value);
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
}";

const SELECT_JS: &str = r"(sel, i, label) => {
  const el = document.querySelectorAll(sel)[i];
  if (!el) return false;
  const option = Array.from(el.options).find(o => o.label.trim() === label || o.text.trim() === label);
  if (!option) return false;
  const setter = Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set;
  setter.call(el, option.value);
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
}";

/// Build `(function)(args...)` with JSON-encoded arguments
fn call(function: &str, args: &[serde_json::Value]) -> String {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("({function})({})", args.join(", "))
}

fn cdp_error(err: impl std::fmt::Display) -> VitrineError {
    VitrineError::driver(err.to_string())
}

/// One Chromium process with a single page
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch a browser with `config` and open a blank page
    pub async fn launch(config: &DriverConfig) -> VitrineResult<Self> {
        let launch_error = |message: String| VitrineError::BrowserLaunch { message };

        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(config.navigation_timeout);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(launch_error)?;

        let (browser, mut events) = Browser::launch(cdp_config)
            .await
            .map_err(|e| launch_error(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(launch_error(err.to_string()));
            }
        };
        tracing::debug!(headless = config.headless, "chromium session ready");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> VitrineResult<T> {
        let result = self.page.evaluate_expression(script).await.map_err(cdp_error)?;
        result.into_value().map_err(cdp_error)
    }

    async fn act(&self, function: &str, element: &ElementHandle, extra: &[&str]) -> VitrineResult<()> {
        let mut args = vec![
            serde_json::Value::from(element.selector.as_str()),
            serde_json::Value::from(element.index),
        ];
        args.extend(extra.iter().map(|v| serde_json::Value::from(*v)));
        let applied: bool = self.eval(call(function, &args)).await?;
        if applied {
            Ok(())
        } else {
            Err(VitrineError::driver(format!(
                "element `{}`[{}] went away before the action",
                element.selector, element.index
            )))
        }
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> VitrineResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| VitrineError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> VitrineResult<String> {
        self.eval("window.location.href".to_string()).await
    }

    async fn query(&self, selector: &str) -> VitrineResult<Vec<ElementHandle>> {
        self.eval(call(SNAPSHOT_JS, &[serde_json::Value::from(selector)]))
            .await
    }

    async fn click(&mut self, element: &ElementHandle) -> VitrineResult<()> {
        self.act(CLICK_JS, element, &[]).await
    }

    async fn set_value(&mut self, element: &ElementHandle, text: &str) -> VitrineResult<()> {
        self.act(SET_VALUE_JS, element, &[text]).await
    }

    async fn select_option(&mut self, element: &ElementHandle, label: &str) -> VitrineResult<()> {
        self.act(SELECT_JS, element, &[label]).await
    }

    async fn go_back(&mut self) -> VitrineResult<()> {
        let _: serde_json::Value = self
            .eval("(() => { window.history.back(); return null; })()".to_string())
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> VitrineResult<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map(|_| ()).map_err(cdp_error);
        if let Err(err) = browser.wait().await {
            tracing::debug!(error = %err, "browser process already gone");
        }
        self.handler.abort();
        closed
    }
}

/// Launches one Chromium process per session
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    config: DriverConfig,
}

impl ChromiumFactory {
    /// Create a factory using `config` for every session
    #[must_use]
    pub const fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn launch(&self) -> VitrineResult<Box<dyn Driver>> {
        Ok(Box::new(ChromiumDriver::launch(&self.config).await?))
    }
}
