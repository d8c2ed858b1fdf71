use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use hookshell_core::Config;
use hookshell_core::hooks::{CanonicalEvent, Dispatcher};

#[derive(Args)]
pub struct ListArgs {
    /// Only show hooks for this event (e.g. PreToolUse)
    #[arg(short, long)]
    pub event: Option<String>,
}

pub fn run(args: ListArgs, config: &Config) -> Result<ExitCode> {
    let events: Vec<CanonicalEvent> = match args.event.as_deref() {
        Some(name) => {
            let event = CanonicalEvent::from_name(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown hook event '{}'", name))?;
            vec![event]
        }
        None => CanonicalEvent::ALL.to_vec(),
    };

    let dispatcher = Dispatcher::from_config(config)?;
    println!("Hooks directory: {}", dispatcher.hooks_dir().display());
    if !dispatcher.is_enabled() {
        println!("Hooks are disabled in config");
    }

    let mut total = 0;
    for event in events {
        let Some(group) = dispatcher.group(event) else {
            continue;
        };

        let blocking = if event.supports_blocking() {
            " (can block)"
        } else {
            ""
        };
        println!("\n{}{}", event, blocking);
        for entry in group.entries() {
            let parallel = if entry.parallel { " (parallel)" } else { "" };
            println!("  matcher: {}{}", display_pattern(entry.matcher.pattern()), parallel);
            for handler in &entry.handlers {
                println!("    - {}", handler.summary());
            }
            total += entry.handlers.len();
        }
    }

    if total == 0 {
        println!("\nNo hooks configured");
    }
    Ok(ExitCode::SUCCESS)
}

fn display_pattern(pattern: &str) -> &str {
    if pattern.is_empty() { "*" } else { pattern }
}
