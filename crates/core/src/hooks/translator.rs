//! Translation between host event data and the hook process protocol
//!
//! Hook processes receive a flat JSON object on stdin and answer with an
//! exit code plus, optionally, a JSON decision object on stdout.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use super::decision::Decision;
use super::event::CanonicalEvent;

/// Exit code that always means "deny", whatever stdout says
pub const DENY_EXIT_CODE: i32 = 2;

const DEFAULT_BLOCK_REASON: &str = "Hook blocked operation";

/// Shape host event data into the object hook processes read from stdin
pub fn to_wire_format(event: CanonicalEvent, data: &Value) -> Value {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let str_field = |key: &str, default: &str| {
        data.get(key)
            .cloned()
            .unwrap_or_else(|| Value::String(default.to_string()))
    };
    let tool_name = || {
        data.get("name")
            .or_else(|| data.get("tool_name"))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    };
    let object_field = |key: &str| data.get(key).cloned().unwrap_or_else(|| json!({}));

    match event {
        CanonicalEvent::PreToolUse => json!({
            "tool_name": tool_name(),
            "tool_input": object_field("input"),
            "timestamp": timestamp,
        }),
        CanonicalEvent::PostToolUse => json!({
            "tool_name": tool_name(),
            "tool_input": object_field("input"),
            "tool_result": object_field("result"),
            "timestamp": timestamp,
        }),
        CanonicalEvent::UserPromptSubmit => json!({
            "prompt": str_field("prompt", ""),
            "timestamp": timestamp,
        }),
        CanonicalEvent::SessionStart => json!({
            "session_id": str_field("session_id", ""),
            "trigger": str_field("trigger", "startup"),
            "timestamp": timestamp,
        }),
        CanonicalEvent::SessionEnd => json!({
            "session_id": str_field("session_id", ""),
            "timestamp": timestamp,
        }),
        _ => {
            let mut passthrough = data.as_object().cloned().unwrap_or_else(Map::new);
            passthrough.insert("timestamp".to_string(), Value::String(timestamp));
            Value::Object(passthrough)
        }
    }
}

/// Turn a finished hook process into a decision. Never fails: anything
/// unrecognised resolves to `continue`.
pub fn from_process_result(exit_code: i32, stdout: &str, stderr: &str) -> Decision {
    if exit_code == DENY_EXIT_CODE {
        let reason = stderr.trim();
        return Decision::deny(if reason.is_empty() {
            DEFAULT_BLOCK_REASON
        } else {
            reason
        });
    }

    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Decision::proceed();
    }

    match serde_json::from_str::<Value>(stdout) {
        Ok(Value::Object(response)) => from_json_response(&response),
        // Plain text output is informational
        _ => Decision::proceed(),
    }
}

fn from_json_response(response: &Map<String, Value>) -> Decision {
    let system_message = response
        .get("systemMessage")
        .and_then(Value::as_str)
        .map(str::to_string);

    let decision = if response.get("decision").and_then(Value::as_str) == Some("block") {
        let reason = response
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BLOCK_REASON);
        Decision::deny(reason)
    } else if let Some(injection) = response.get("contextInjection") {
        Decision::inject_context(text_of(injection))
    } else if let Some(content) = response.get("newContent") {
        Decision::modify(content.clone())
    } else {
        Decision::proceed()
    };

    match system_message {
        Some(message) => decision.with_user_message(message),
        None => decision,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
