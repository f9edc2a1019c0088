//! CLI command definitions using clap

use crate::config::{ColorChoice, LogFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vitrine::{ReportFormat, RunConfig};

/// Vitrine: run auto-waiting browser scenarios against a storefront
#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures and summary only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true, env = "VITRINE_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the storefront
    Run(RunArgs),

    /// List groups and scenarios without running them
    List(ListArgs),
}

/// Where scenarios come from
#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// Only this scenario group
    #[arg(short, long, env = "VITRINE_GROUP")]
    pub group: Option<String>,

    /// Load scenarios from a YAML suite file instead of the built-in suite
    #[arg(short, long, env = "VITRINE_SUITE")]
    pub suite: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Scenario selection
    #[command(flatten)]
    pub selection: SuiteArgs,

    /// Run the browser without a window (the default)
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long, env = "VITRINE_HEADED")]
    pub headed: bool,

    /// Per-action polling deadline in milliseconds
    #[arg(short, long, env = "VITRINE_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Polling interval in milliseconds
    #[arg(long, env = "VITRINE_POLL_INTERVAL")]
    pub poll_interval: Option<u64>,

    /// Page load deadline in milliseconds
    #[arg(long, env = "VITRINE_NAVIGATION_TIMEOUT")]
    pub navigation_timeout: Option<u64>,

    /// Storefront root URL
    #[arg(long, env = "VITRINE_BASE_URL")]
    pub base_url: Option<String>,

    /// Login name
    #[arg(long, env = "VITRINE_USERNAME")]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "VITRINE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Concurrent browser sessions (0 = available parallelism)
    #[arg(short = 'j', long, env = "VITRINE_JOBS")]
    pub jobs: Option<usize>,

    /// Browser executable
    #[arg(long, env = "VITRINE_BROWSER")]
    pub browser: Option<String>,

    /// Disable the browser sandbox (containers)
    #[arg(long, env = "VITRINE_NO_SANDBOX")]
    pub no_sandbox: bool,

    /// Write the report to this file
    #[arg(short, long, env = "VITRINE_REPORT")]
    pub report: Option<PathBuf>,

    /// Report format
    #[arg(short, long, default_value = "text", env = "VITRINE_FORMAT")]
    pub format: FormatArg,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            selection: SuiteArgs::default(),
            headless: false,
            headed: false,
            timeout: None,
            poll_interval: None,
            navigation_timeout: None,
            base_url: None,
            username: None,
            password: None,
            jobs: None,
            browser: None,
            no_sandbox: false,
            report: None,
            format: FormatArg::Text,
        }
    }
}

impl RunArgs {
    /// Apply the given flags on top of `base`
    #[must_use]
    pub fn run_config(&self, base: RunConfig) -> RunConfig {
        let mut config = base.with_headless(!self.headed);
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if self.username.is_some() || self.password.is_some() {
            let username = self.username.clone().unwrap_or_else(|| config.username.clone());
            let password = self.password.clone().unwrap_or_else(|| config.password.clone());
            config = config.with_credentials(username, password);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(interval) = self.poll_interval {
            config = config.with_poll_interval(interval);
        }
        if let Some(timeout) = self.navigation_timeout {
            config = config.with_navigation_timeout(timeout);
        }
        if let Some(jobs) = self.jobs {
            config = config.with_max_sessions(jobs);
        }
        if let Some(path) = &self.browser {
            config = config.with_browser_path(path.clone());
        }
        if self.no_sandbox {
            config = config.no_sandbox();
        }
        config
    }
}

/// Arguments for the list command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Scenario selection
    #[command(flatten)]
    pub selection: SuiteArgs,

    /// Storefront root URL used in the listed steps
    #[arg(long, env = "VITRINE_BASE_URL")]
    pub base_url: Option<String>,

    /// Print the suite as YAML instead of a summary
    #[arg(long)]
    pub yaml: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty JSON
    Json,
    /// `JUnit` XML
    Junit,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
            FormatArg::Junit => Self::Junit,
        }
    }
}
