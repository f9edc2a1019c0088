//! Vitrine CLI: run storefront browser scenarios
//!
//! ## Usage
//!
//! ```bash
//! vitrine run                          # Run the built-in storefront suite
//! vitrine run --group cart --headed    # One group, visible browser
//! vitrine run --format junit -r out.xml
//! vitrine list --yaml > suite.yaml     # Export the suite for editing
//! ```

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vitrine_cli::{
    list, outcome, Cli, CliConfig, CliResult, Commands, LogFormat, ScenarioRunner, Verbosity,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(&config);

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

fn init_logging(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(config.color.should_color()).init(),
    }
}

fn run(cli: Cli, config: CliConfig) -> CliResult<()> {
    match cli.command {
        Commands::List(args) => {
            print!("{}", list(&args)?);
            Ok(())
        }
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let report = runtime.block_on(async {
                ScenarioRunner::new(config)
                    .run(&args, None, interrupted())
                    .await
            })?;
            outcome(&report)
        }
    }
}

/// Resolves on Ctrl-C; never if the signal handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::warn!("interrupted, shutting down sessions");
}
