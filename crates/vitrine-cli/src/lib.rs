//! Vitrine CLI Library
//!
//! Command-line interface for running Vitrine storefront suites.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, FormatArg, ListArgs, LogFormatArg, RunArgs, SuiteArgs};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult, EXIT_FAILED, EXIT_USAGE};
pub use output::ProgressReporter;
pub use runner::{browser_factory, list, load_suite, outcome, ScenarioRunner};
