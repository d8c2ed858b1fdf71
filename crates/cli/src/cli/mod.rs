use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hookshell_core::env::HOOKSHELL_CONFIG;

pub mod dispatch;
pub mod list;

#[derive(Parser)]
#[command(name = "hookshell")]
#[command(about = "Run lifecycle hooks configured in hooks.json files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, env = HOOKSHELL_CONFIG)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch a host event (e.g. tool:pre) and print the resulting decision
    Dispatch(dispatch::DispatchArgs),

    /// Show the configured hooks
    List(list::ListArgs),
}
