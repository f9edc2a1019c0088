//! Run reports: per-scenario records, live sinks, and JSON / JUnit / text
//! rendering for CI.

use crate::result::VitrineResult;
use crate::scenario::{ScenarioResult, ScenarioStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Record of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Group the scenario belongs to
    pub group: String,
    /// Scenario name
    pub name: String,
    /// Terminal status
    pub status: ScenarioStatus,
    /// Failing step description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failing_step: Option<String>,
    /// Last observed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Expected value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Build a record from a sequencer result
    #[must_use]
    pub fn from_result(group: &str, result: &ScenarioResult) -> Self {
        let error = result.error();
        Self {
            group: group.to_string(),
            name: result.name.clone(),
            status: result.status,
            failing_step: result.failing_step().map(str::to_string),
            actual: error.and_then(|e| e.actual()).map(str::to_string),
            expected: error.and_then(|e| e.expected()).map(str::to_string),
            error: error.map(ToString::to_string),
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

/// Status counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Passed scenarios
    pub passed: usize,
    /// Failed scenarios
    pub failed: usize,
    /// Placeholder scenarios
    pub empty: usize,
    /// All scenarios
    pub total: usize,
}

/// Record of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Start time (RFC 3339)
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Status counts
    pub summary: Summary,
    /// Scenario records, grouped in suite order
    pub scenarios: Vec<ScenarioReport>,
    /// The run was interrupted; scenarios after the interruption are absent
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    /// Start a new report now
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 0,
            summary: Summary::default(),
            scenarios: Vec::new(),
            cancelled: false,
        }
    }

    /// Add a scenario record
    pub fn push(&mut self, report: ScenarioReport) {
        match report.status {
            ScenarioStatus::Passed => self.summary.passed += 1,
            ScenarioStatus::Failed => self.summary.failed += 1,
            ScenarioStatus::Empty => self.summary.empty += 1,
            ScenarioStatus::Pending | ScenarioStatus::Running => {}
        }
        self.summary.total += 1;
        self.scenarios.push(report);
    }

    /// No scenario failed (`Passed` and `Empty` are both fine)
    #[must_use]
    pub const fn all_ok(&self) -> bool {
        self.summary.failed == 0 && !self.cancelled
    }

    /// Records of one group
    pub fn group<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ScenarioReport> + 'a {
        self.scenarios.iter().filter(move |s| s.group == name)
    }

    /// Group names, in first-seen order
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for s in &self.scenarios {
            if !names.contains(&s.group.as_str()) {
                names.push(&s.group);
            }
        }
        names
    }

    /// Pretty JSON
    pub fn to_json(&self) -> VitrineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuites name="vitrine" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            self.summary.total,
            self.summary.failed,
            self.summary.empty,
            ms_to_secs(self.duration_ms)
        );

        for group in self.group_names() {
            let cases: Vec<&ScenarioReport> = self.group(group).collect();
            let failures = cases.iter().filter(|c| c.status.is_failed()).count();
            let skipped = cases
                .iter()
                .filter(|c| c.status == ScenarioStatus::Empty)
                .count();
            let time: u64 = cases.iter().map(|c| c.duration_ms).sum();
            let _ = writeln!(
                xml,
                r#"  <testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
                escape_xml(group),
                cases.len(),
                failures,
                skipped,
                ms_to_secs(time)
            );
            for case in cases {
                let _ = write!(
                    xml,
                    r#"    <testcase classname="{}" name="{}" time="{:.3}""#,
                    escape_xml(group),
                    escape_xml(&case.name),
                    ms_to_secs(case.duration_ms)
                );
                match case.status {
                    ScenarioStatus::Failed => {
                        let message = case
                            .failing_step
                            .as_deref()
                            .unwrap_or("scenario failed");
                        let body = failure_body(case);
                        let _ = writeln!(
                            xml,
                            ">\n      <failure message=\"{}\">{}</failure>\n    </testcase>",
                            escape_xml(message),
                            escape_xml(&body)
                        );
                    }
                    ScenarioStatus::Empty => {
                        xml.push_str(
                            ">\n      <skipped message=\"no steps\"/>\n    </testcase>\n",
                        );
                    }
                    _ => xml.push_str("/>\n"),
                }
            }
            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }

    /// Render a human-readable summary
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for group in self.group_names() {
            let _ = writeln!(out, "{group}");
            for case in self.group(group) {
                let tag = match case.status {
                    ScenarioStatus::Passed => "PASS ",
                    ScenarioStatus::Failed => "FAIL ",
                    ScenarioStatus::Empty => "EMPTY",
                    ScenarioStatus::Pending | ScenarioStatus::Running => "?    ",
                };
                let _ = writeln!(out, "  {tag} {} ({}ms)", case.name, case.duration_ms);
                if case.status.is_failed() {
                    for line in failure_body(case).lines() {
                        let _ = writeln!(out, "        {line}");
                    }
                }
            }
        }
        if self.cancelled {
            out.push_str("\nrun cancelled\n");
        }
        let _ = writeln!(
            out,
            "\n{} passed, {} failed, {} empty ({} total) in {:.2}s",
            self.summary.passed,
            self.summary.failed,
            self.summary.empty,
            self.summary.total,
            ms_to_secs(self.duration_ms)
        );
        out
    }

    /// Render in `format`
    pub fn render(&self, format: ReportFormat) -> VitrineResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.to_json(),
            ReportFormat::Junit => Ok(self.render_junit()),
        }
    }

    /// Write the report to `path` in `format`
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> VitrineResult<()> {
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

fn failure_body(case: &ScenarioReport) -> String {
    let mut body = String::new();
    if let Some(step) = &case.failing_step {
        let _ = writeln!(body, "step: {step}");
    }
    if let Some(expected) = &case.expected {
        let _ = writeln!(body, "expected: {expected}");
    }
    if let Some(actual) = &case.actual {
        let _ = writeln!(body, "actual: {actual}");
    }
    if let Some(error) = &case.error {
        let _ = writeln!(body, "error: {error}");
    }
    body
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Report serialization format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty JSON
    Json,
    /// JUnit XML
    Junit,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "junit" | "xml" => Ok(Self::Junit),
            other => Err(format!("unknown report format {other:?}")),
        }
    }
}

/// Receives scenario records as they finish
pub trait ReportSink: Send + Sync {
    /// A group's session is about to start
    fn group_started(&self, _group: &str, _scenarios: usize) {}

    /// A scenario reached a terminal status
    fn scenario_finished(&self, report: &ScenarioReport);
}
