//! Command execution: suite loading, session runs, report output

use crate::commands::{ListArgs, RunArgs, SuiteArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use std::fmt::Write as _;
use std::future::Future;
use std::io::Write as _;
use std::sync::Arc;
use vitrine::{saucedemo, DriverFactory, ReportFormat, RunConfig, RunReport, Suite, SuiteRunner};

/// Load the requested suite (file or built-in) and narrow it to one group
pub fn load_suite(selection: &SuiteArgs, config: &RunConfig) -> CliResult<Suite> {
    let suite = match &selection.suite {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading suite file");
            Suite::from_file(path)?
        }
        None => saucedemo::suite(config),
    };
    Ok(suite.select(selection.group.as_deref())?)
}

/// Sessions for real runs
#[cfg(feature = "browser")]
pub fn browser_factory(config: &RunConfig) -> CliResult<Arc<dyn DriverFactory>> {
    Ok(Arc::new(vitrine::ChromiumFactory::new(config.driver_config())))
}

/// Sessions for real runs
#[cfg(not(feature = "browser"))]
pub fn browser_factory(_config: &RunConfig) -> CliResult<Arc<dyn DriverFactory>> {
    Err(CliError::config(
        "vitrine was built without the `browser` feature",
    ))
}

/// Runs suites and writes their reports
#[derive(Debug)]
pub struct ScenarioRunner {
    config: CliConfig,
    reporter: Arc<ProgressReporter>,
}

impl ScenarioRunner {
    /// Create a new runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter = ProgressReporter::new(
            config.color.should_color(),
            config.verbosity.is_quiet(),
        )
        .with_verbose(config.verbosity.is_verbose());
        Self {
            config,
            reporter: Arc::new(reporter),
        }
    }

    /// Execute `vitrine run`, stopping early when `cancel` resolves.
    ///
    /// Returns the report; callers turn failed scenarios into an exit code
    /// with [`outcome`].
    pub async fn run<C>(
        &mut self,
        args: &RunArgs,
        factory: Option<Arc<dyn DriverFactory>>,
        cancel: C,
    ) -> CliResult<RunReport>
    where
        C: Future<Output = ()>,
    {
        let run_config = args.run_config(RunConfig::default());
        run_config.validate()?;
        let suite = load_suite(&args.selection, &run_config)?;
        let factory = match factory {
            Some(factory) => factory,
            None => browser_factory(&run_config)?,
        };

        tracing::info!(
            suite = %suite.name,
            groups = suite.groups.len(),
            scenarios = suite.scenario_count(),
            base_url = %run_config.base_url,
            "starting run"
        );
        if let Some(reporter) = Arc::get_mut(&mut self.reporter) {
            reporter.start(&suite);
        }
        let runner = SuiteRunner::new(factory, &run_config).with_sink(self.reporter.clone());
        let report = runner.run_until(&suite, cancel).await;
        self.reporter.finish();

        self.emit(&report, args)?;
        self.reporter.summary(&report);
        Ok(report)
    }

    fn emit(&self, report: &RunReport, args: &RunArgs) -> CliResult<()> {
        let format = ReportFormat::from(args.format);
        if let Some(path) = &args.report {
            report
                .write_to(path, format)
                .map_err(|e| CliError::report_generation(format!("{}: {e}", path.display())))?;
            tracing::info!(path = %path.display(), ?format, "report written");
        }
        // with a report file, stdout still gets the human summary
        let stdout_format = if args.report.is_some() {
            ReportFormat::Text
        } else {
            format
        };
        if self.config.verbosity.is_quiet() && stdout_format == ReportFormat::Text {
            return Ok(());
        }
        let rendered = report.render(stdout_format)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Map a finished run onto the CLI result
pub fn outcome(report: &RunReport) -> CliResult<()> {
    if report.cancelled {
        return Err(CliError::Cancelled);
    }
    match report.summary.failed {
        0 => Ok(()),
        failed => Err(CliError::ScenariosFailed { failed }),
    }
}

/// Execute `vitrine list`
pub fn list(args: &ListArgs) -> CliResult<String> {
    let mut config = RunConfig::default();
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url.clone());
    }
    let suite = load_suite(&args.selection, &config)?;
    if args.yaml {
        return Ok(suite.to_yaml()?);
    }

    let mut out = String::new();
    for group in &suite.groups {
        let setup = if group.setup.is_empty() {
            String::new()
        } else {
            format!(" (setup: {} steps)", group.setup.len())
        };
        let _ = writeln!(out, "{}{setup}", group.name);
        for scenario in &group.scenarios {
            if scenario.is_empty() {
                let _ = writeln!(out, "  - {} [empty]", scenario.name);
            } else {
                let _ = writeln!(out, "  - {} ({} steps)", scenario.name, scenario.steps.len());
            }
        }
    }
    let _ = writeln!(
        out,
        "\n{} groups, {} scenarios ({} empty)",
        suite.groups.len(),
        suite.scenario_count(),
        suite.empty_count()
    );
    Ok(out)
}
