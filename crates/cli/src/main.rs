use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use hookshell_core::Config;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    let config = Config::load_or_default(cli.config.as_deref())?;

    // Hooks talk over stdout, so logs go to stderr ("warn" unless configured or --verbose)
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Dispatch(args) => crate::cli::dispatch::run(args, &config).await,
        Commands::List(args) => crate::cli::list::run(args, &config),
    }
}
