//! Scenario sequencer.
//!
//! A scenario's steps run strictly in order against one session; the first
//! failing step ends the scenario. A group's setup runs before every
//! scenario of the group, in the scenario's own fresh context.

use crate::action::{ActionExecutor, StepFailure};
use crate::context::Context;
use crate::driver::Driver;
use crate::result::VitrineError;
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of one scenario: `Pending -> Running -> {Passed | Failed | Empty}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Not started
    Pending,
    /// Executing
    Running,
    /// Every step passed
    Passed,
    /// A step (or the setup) failed
    Failed,
    /// No steps: an unimplemented placeholder, never counted as passed
    Empty,
}

impl ScenarioStatus {
    /// Check if status is terminal
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Empty)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Empty => "empty",
        };
        f.write_str(s)
    }
}

/// One end-to-end test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Ordered steps; empty for a placeholder
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Create a scenario
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// A scenario with no steps yet
    #[must_use]
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Whether the scenario has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Scenarios sharing a setup and a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioGroup {
    /// Group name
    pub name: String,
    /// Steps run before each scenario
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<Step>,
    /// Scenarios, run in order
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl ScenarioGroup {
    /// Create an empty group
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup: Vec::new(),
            scenarios: Vec::new(),
        }
    }

    /// Set the shared setup
    #[must_use]
    pub fn with_setup(mut self, setup: Vec<Step>) -> Self {
        self.setup = setup;
        self
    }

    /// Append a scenario
    #[must_use]
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Whether any scenario has steps (and so needs a session)
    #[must_use]
    pub fn needs_session(&self) -> bool {
        self.scenarios.iter().any(|s| !s.is_empty())
    }
}

/// Outcome of one scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Terminal status
    pub status: ScenarioStatus,
    /// Scenario steps that passed before the end
    pub steps_passed: usize,
    /// What stopped the scenario, if it failed
    pub failure: Option<StepFailure>,
    /// Wall time, setup included
    pub duration: Duration,
}

impl ScenarioResult {
    /// An `Empty` result
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Empty,
            steps_passed: 0,
            failure: None,
            duration: Duration::ZERO,
        }
    }

    /// A `Failed` result that never reached its own steps
    #[must_use]
    pub fn failed(name: impl Into<String>, step: impl Into<String>, error: VitrineError) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Failed,
            steps_passed: 0,
            failure: Some(StepFailure {
                step: step.into(),
                error,
            }),
            duration: Duration::ZERO,
        }
    }

    /// Description of the failing step
    #[must_use]
    pub fn failing_step(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.step.as_str())
    }

    /// Cause of failure
    #[must_use]
    pub fn error(&self) -> Option<&VitrineError> {
        self.failure.as_ref().map(|f| &f.error)
    }
}

/// Runs scenarios step by step
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequencer {
    executor: ActionExecutor,
}

impl Sequencer {
    /// Create a sequencer using `executor`
    #[must_use]
    pub const fn new(executor: ActionExecutor) -> Self {
        Self { executor }
    }

    /// Run `scenario` after `setup` on `driver`.
    ///
    /// Placeholders report `Empty` without touching the session.
    pub async fn run(
        &self,
        scenario: &Scenario,
        setup: &[Step],
        driver: &mut dyn Driver,
    ) -> ScenarioResult {
        let mut status = ScenarioStatus::Pending;
        if scenario.is_empty() {
            tracing::info!(scenario = %scenario.name, "no steps, reporting empty");
            return ScenarioResult::empty(scenario.name.clone());
        }

        let started = Instant::now();
        transition(&scenario.name, &mut status, ScenarioStatus::Running);
        let mut ctx = Context::new();
        let mut result = ScenarioResult {
            name: scenario.name.clone(),
            status,
            steps_passed: 0,
            failure: None,
            duration: Duration::ZERO,
        };

        for step in setup {
            if let Err(failure) = self.executor.execute(step, &mut *driver, &mut ctx).await {
                tracing::warn!(scenario = %scenario.name, step = %failure.step, "setup failed");
                result.failure = Some(StepFailure {
                    step: format!("setup: {}", failure.step),
                    error: failure.error,
                });
                break;
            }
        }

        if result.failure.is_none() {
            for step in &scenario.steps {
                match self.executor.execute(step, &mut *driver, &mut ctx).await {
                    Ok(_) => result.steps_passed += 1,
                    Err(failure) => {
                        tracing::warn!(
                            scenario = %scenario.name,
                            step = %failure.step,
                            error = %failure.error,
                            "step failed"
                        );
                        result.failure = Some(failure);
                        break;
                    }
                }
            }
        }

        let terminal = if result.failure.is_some() {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };
        transition(&scenario.name, &mut status, terminal);
        result.status = status;
        result.duration = started.elapsed();
        result
    }
}

fn transition(scenario: &str, status: &mut ScenarioStatus, next: ScenarioStatus) {
    tracing::debug!(scenario, from = %status, to = %next, "scenario state");
    *status = next;
}
