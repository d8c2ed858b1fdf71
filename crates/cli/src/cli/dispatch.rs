use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use hookshell_core::Config;
use hookshell_core::hooks::{DENY_EXIT_CODE, Dispatcher, EventBus};
use serde_json::Value;
use tracing::debug;

#[derive(Args)]
pub struct DispatchArgs {
    /// Host event name (tool:pre, tool:post, prompt:submit, session:start, ...)
    pub event: String,

    /// Read the event payload from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

pub async fn run(args: DispatchArgs, config: &Config) -> Result<ExitCode> {
    let payload = read_payload(args.input.as_deref())?;

    let dispatcher = Arc::new(Dispatcher::from_config(config)?);
    let bus = EventBus::new();
    let mount = dispatcher.mount(&bus);

    debug!("Dispatching '{}' with payload {}", args.event, payload);
    let decision = bus.emit(&args.event, payload).await;

    mount.unmount();
    dispatcher.cleanup();

    println!("{}", serde_json::to_string_pretty(&decision)?);

    if decision.is_allowed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(DENY_EXIT_CODE as u8))
    }
}

fn read_payload(path: Option<&std::path::Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read payload from stdin")?;
            raw
        }
    };
    parse_payload(&raw)
}

/// Empty input is an empty object
fn parse_payload(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let payload: Value = serde_json::from_str(raw).context("Payload is not valid JSON")?;
    anyhow::ensure!(payload.is_object(), "Payload must be a JSON object");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload("").unwrap(), json!({}));
        assert_eq!(parse_payload("  \n").unwrap(), json!({}));
        assert_eq!(
            parse_payload(r#"{"name": "Bash"}"#).unwrap(),
            json!({"name": "Bash"})
        );
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("{not json").is_err());
    }

    #[test]
    fn test_read_payload_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event.json");
        fs::write(&path, r#"{"prompt": "hi"}"#).unwrap();

        assert_eq!(read_payload(Some(path.as_path())).unwrap(), json!({"prompt": "hi"}));
        assert!(read_payload(Some(dir.path().join("missing.json").as_path())).is_err());
    }
}
