//! Vitrine: declarative, auto-waiting browser scenarios for storefront suites
//!
//! Scenarios are ordered lists of [`Step`]s. Every locate, action and
//! assertion polls the live page until it succeeds or its deadline passes,
//! so no step sleeps for a fixed time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    VITRINE Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Suite      │    │ Suite      │    │ Driver     │            │
//! │   │ (groups of │───►│ Runner     │───►│ session    │            │
//! │   │ scenarios) │    │ (parallel) │    │ per group  │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │ Sequencer → ActionExecutor           │
//! │                           ▼                                      │
//! │                    ┌────────────┐                                │
//! │                    │ RunReport  │ text / JSON / JUnit            │
//! │                    └────────────┘                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod action;
mod assertion;
mod compare;
mod config;
mod context;
mod driver;
mod locator;
mod report;
mod result;
mod scenario;
mod session;
mod step;
mod suite;
mod wait;

#[cfg(feature = "browser")]
mod browser;

/// In-memory driver for tests and dry runs
pub mod mock;

/// Built-in saucedemo storefront suite
pub mod saucedemo;

pub use action::{ActionExecutor, ActionOutcome, StepFailure};
pub use assertion::{assert_eventually, Actual, ActualSupplier, AssertOutcome, Expectation, PageProbe, Probe};
pub use compare::{compare_natural, OrderViolation, SortOrder};
pub use config::{RunConfig, DEFAULT_BASE_URL, DEFAULT_PASSWORD, DEFAULT_USERNAME};
pub use context::{escape_placeholders, Context};
pub use driver::{Driver, DriverConfig, DriverFactory, ElementHandle};
pub use locator::{locate, locate_actionable, locate_all, Actionability, Index, Locator, Target};
pub use report::{ReportFormat, ReportSink, RunReport, ScenarioReport, Summary};
pub use result::{VitrineError, VitrineResult};
pub use scenario::{Scenario, ScenarioGroup, ScenarioResult, ScenarioStatus, Sequencer};
pub use session::SuiteRunner;
pub use step::{Expected, Step, Subject};
pub use suite::Suite;
pub use wait::{Deadline, WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumFactory};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Driver, DriverFactory, Expected, ReportFormat, RunConfig, RunReport, Scenario,
        ScenarioGroup, ScenarioStatus, Step, Subject, Suite, SuiteRunner, VitrineError,
        VitrineResult,
    };
}
