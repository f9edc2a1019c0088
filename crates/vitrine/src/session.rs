//! Suite runner.
//!
//! Each group owns one isolated session and runs its scenarios strictly in
//! order; independent groups run in parallel, capped by a session limit.
//! Sessions are closed on every exit path, including cancellation.

use crate::config::RunConfig;
use crate::driver::{Driver, DriverFactory};
use crate::report::{ReportSink, RunReport, ScenarioReport};
use crate::result::VitrineError;
use crate::scenario::{ScenarioGroup, ScenarioResult, Sequencer};
use crate::suite::Suite;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// Runs suites over sessions opened by a [`DriverFactory`]
#[derive(Clone)]
pub struct SuiteRunner {
    factory: Arc<dyn DriverFactory>,
    sequencer: Sequencer,
    max_sessions: usize,
    sink: Option<Arc<dyn ReportSink>>,
}

impl std::fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("sequencer", &self.sequencer)
            .field("max_sessions", &self.max_sessions)
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl SuiteRunner {
    /// Create a runner for `config`, opening sessions with `factory`
    #[must_use]
    pub fn new(factory: Arc<dyn DriverFactory>, config: &RunConfig) -> Self {
        Self {
            factory,
            sequencer: Sequencer::new(config.executor()),
            max_sessions: config.session_limit(),
            sink: None,
        }
    }

    /// Report scenarios to `sink` as they finish
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Cap concurrent sessions
    #[must_use]
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max.max(1);
        self
    }

    /// Run every group of `suite` to completion
    pub async fn run(&self, suite: &Suite) -> RunReport {
        self.run_until(suite, std::future::pending()).await
    }

    /// Run `suite`, stopping early once `cancel` resolves.
    ///
    /// On cancellation the scenario in flight in each group is reported as
    /// failed, later scenarios are left out, and every open session is
    /// closed before this returns.
    pub async fn run_until<C>(&self, suite: &Suite, cancel: C) -> RunReport
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let mut report = RunReport::new();
        tracing::info!(
            run_id = %report.run_id,
            groups = suite.groups.len(),
            max_sessions = self.max_sessions,
            "run started"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let permits = Arc::new(Semaphore::new(self.max_sessions.max(1)));
        let mut tasks = JoinSet::new();
        for (position, group) in suite.groups.iter().enumerate() {
            let job = GroupJob {
                factory: Arc::clone(&self.factory),
                sequencer: self.sequencer,
                sink: self.sink.clone(),
                group: group.clone(),
                permits: Arc::clone(&permits),
                cancel: cancel_rx.clone(),
            };
            tasks.spawn(async move { (position, job.run().await) });
        }

        let mut finished: Vec<Option<Vec<ScenarioReport>>> = vec![None; suite.groups.len()];
        tokio::pin!(cancel);
        let mut cancelled = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((position, reports))) => finished[position] = Some(reports),
                    Some(Err(err)) => tracing::error!(error = %err, "group task aborted"),
                },
                () = &mut cancel, if !cancelled => {
                    tracing::warn!("cancellation requested, closing sessions");
                    cancelled = true;
                    let _ = cancel_tx.send(true);
                }
            }
        }

        for (group, reports) in suite.groups.iter().zip(finished) {
            match reports {
                Some(reports) => reports.into_iter().for_each(|r| report.push(r)),
                None if !cancelled => {
                    for scenario in &group.scenarios {
                        let result = ScenarioResult::failed(
                            scenario.name.clone(),
                            "run group",
                            VitrineError::driver("group task ended unexpectedly"),
                        );
                        report.push(ScenarioReport::from_result(&group.name, &result));
                    }
                }
                None => {}
            }
        }
        report.cancelled = cancelled;
        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = %report.run_id,
            passed = report.summary.passed,
            failed = report.summary.failed,
            empty = report.summary.empty,
            elapsed_ms = report.duration_ms,
            "run finished"
        );
        report
    }
}

/// Everything one group task owns
struct GroupJob {
    factory: Arc<dyn DriverFactory>,
    sequencer: Sequencer,
    sink: Option<Arc<dyn ReportSink>>,
    group: ScenarioGroup,
    permits: Arc<Semaphore>,
    cancel: watch::Receiver<bool>,
}

impl GroupJob {
    #[tracing::instrument(name = "group", skip_all, fields(group = %self.group.name))]
    async fn run(mut self) -> Vec<ScenarioReport> {
        if let Some(sink) = &self.sink {
            sink.group_started(&self.group.name, self.group.scenarios.len());
        }
        if !self.group.needs_session() {
            tracing::info!("only placeholders, no session opened");
            return self
                .group
                .scenarios
                .iter()
                .map(|s| self.record(&ScenarioResult::empty(s.name.clone())))
                .collect();
        }

        // nothing is launched once cancellation is signalled
        let permits = Arc::clone(&self.permits);
        let _permit = tokio::select! {
            biased;
            () = cancelled(&mut self.cancel) => {
                tracing::info!("cancelled while waiting for a session slot");
                return Vec::new();
            }
            permit = permits.acquire_owned() => permit.ok(),
        };
        let factory = Arc::clone(&self.factory);
        let launched = tokio::select! {
            biased;
            () = cancelled(&mut self.cancel) => {
                tracing::info!("cancelled during session launch");
                return Vec::new();
            }
            launched = factory.launch() => launched,
        };
        let mut driver = match launched {
            Ok(driver) => driver,
            Err(err) => {
                tracing::error!(error = %err, "session launch failed");
                return self.fail_all(&err);
            }
        };

        let reports = self.run_scenarios(driver.as_mut()).await;

        if let Err(err) = driver.close().await {
            tracing::warn!(error = %err, "session close failed");
        }
        reports
    }

    async fn run_scenarios(&mut self, driver: &mut dyn Driver) -> Vec<ScenarioReport> {
        let mut reports = Vec::with_capacity(self.group.scenarios.len());
        let group = self.group.clone();
        for scenario in &group.scenarios {
            if *self.cancel.borrow() {
                break;
            }
            tracing::info!(scenario = %scenario.name, "scenario started");
            let run = self.sequencer.run(scenario, &group.setup, &mut *driver);
            let result = tokio::select! {
                result = run => result,
                () = cancelled(&mut self.cancel) => ScenarioResult::failed(
                    scenario.name.clone(),
                    "interrupted",
                    VitrineError::Cancelled,
                ),
            };
            tracing::info!(
                scenario = %scenario.name,
                status = %result.status,
                elapsed_ms = result.duration.as_millis() as u64,
                "scenario finished"
            );
            reports.push(self.record(&result));
        }
        reports
    }

    fn fail_all(&self, err: &VitrineError) -> Vec<ScenarioReport> {
        self.group
            .scenarios
            .iter()
            .map(|s| {
                let result = if s.is_empty() {
                    ScenarioResult::empty(s.name.clone())
                } else {
                    ScenarioResult::failed(
                        s.name.clone(),
                        "launch session",
                        VitrineError::BrowserLaunch {
                            message: err.to_string(),
                        },
                    )
                };
                self.record(&result)
            })
            .collect()
    }

    fn record(&self, result: &ScenarioResult) -> ScenarioReport {
        let report = ScenarioReport::from_result(&self.group.name, result);
        if let Some(sink) = &self.sink {
            sink.scenario_finished(&report);
        }
        report
    }
}

/// Resolves once cancellation is signalled; never if the sender goes away.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
