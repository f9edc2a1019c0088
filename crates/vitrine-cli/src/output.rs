//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use vitrine::{ReportSink, RunReport, ScenarioReport, ScenarioStatus, Suite};

/// Live progress on stderr while scenarios finish
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print every scenario, not only failures
    pub verbose: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// Also print passed and empty scenarios
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start a progress bar over every scenario of `suite`
    pub fn start(&mut self, suite: &Suite) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(suite.scenario_count() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(suite.name.clone());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, line: &str) {
        match &self.progress_bar {
            Some(pb) => pb.println(line),
            None => {
                let _ = self.term.write_line(line);
            }
        }
    }

    fn tag(&self, status: ScenarioStatus) -> String {
        let (mark, plain, color) = match status {
            ScenarioStatus::Passed => ("✓", "PASS ", Style::new().green().bold()),
            ScenarioStatus::Failed => ("✗", "FAIL ", Style::new().red().bold()),
            ScenarioStatus::Empty => ("○", "EMPTY", Style::new().yellow()),
            ScenarioStatus::Pending | ScenarioStatus::Running => ("…", "?    ", Style::new()),
        };
        if self.use_color {
            color.apply_to(mark).to_string()
        } else {
            plain.to_string()
        }
    }

    /// Render one finished scenario
    #[must_use]
    pub fn format_scenario(&self, report: &ScenarioReport) -> String {
        let mut out = format!(
            "{} {} / {} ({}ms)",
            self.tag(report.status),
            report.group,
            report.name,
            report.duration_ms
        );
        if report.status.is_failed() {
            if let Some(step) = &report.failing_step {
                out.push_str(&format!("\n    at: {step}"));
            }
            if let Some(error) = &report.error {
                out.push_str(&format!("\n    {error}"));
            }
        }
        out
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        self.line(&format!("{prefix} {message}"));
    }

    /// Print the run summary
    pub fn summary(&self, report: &RunReport) {
        let failed = report.summary.failed;
        if self.quiet && failed == 0 && !report.cancelled {
            return;
        }

        let seconds = Duration::from_millis(report.duration_ms).as_secs_f64();
        let status = if report.cancelled {
            "CANCELLED"
        } else if failed > 0 {
            "FAILED"
        } else {
            "PASSED"
        };
        let line = format!(
            "{status} {} scenarios in {seconds:.2}s ({} passed, {failed} failed, {} empty)",
            report.summary.total, report.summary.passed, report.summary.empty
        );
        let line = if !self.use_color {
            line
        } else if failed > 0 || report.cancelled {
            style(line).red().bold().to_string()
        } else {
            style(line).green().bold().to_string()
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&line);
    }
}

impl ReportSink for ProgressReporter {
    fn group_started(&self, group: &str, scenarios: usize) {
        if self.verbose && !self.quiet {
            self.line(&format!("group {group}: {scenarios} scenario(s)"));
        }
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
            pb.set_message(report.name.clone());
        }
        // failures always show, even in quiet mode
        if report.status.is_failed() || (self.verbose && !self.quiet) {
            self.line(&self.format_scenario(report));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn failed() -> ScenarioReport {
        ScenarioReport {
            group: "cart".to_string(),
            name: "badge".to_string(),
            status: ScenarioStatus::Failed,
            failing_step: Some("click #add".to_string()),
            actual: None,
            expected: None,
            error: Some("Element `#add` is not interactable: element is hidden".to_string()),
            duration_ms: 12,
        }
    }

    #[test]
    fn test_plain_failure_lines() {
        let reporter = ProgressReporter::new(false, true);
        let text = reporter.format_scenario(&failed());
        assert!(text.starts_with("FAIL  cart / badge (12ms)"));
        assert!(text.contains("at: click #add"));
        assert!(text.contains("element is hidden"));
    }

    #[test]
    fn test_passed_lines_have_no_detail() {
        let reporter = ProgressReporter::new(false, false);
        let mut report = failed();
        report.status = ScenarioStatus::Passed;
        assert_eq!(reporter.format_scenario(&report), "PASS  cart / badge (12ms)");
    }

    #[test]
    fn test_sink_without_bar_does_not_panic() {
        let reporter = ProgressReporter::new(false, true).with_verbose(true);
        reporter.group_started("cart", 3);
        reporter.scenario_finished(&failed());
        reporter.finish();
    }
}
