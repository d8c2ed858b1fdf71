//! Prompt hooks: natural-language checks answered by a reasoning provider
//!
//! The provider is asked a yes/no style question and its free-form reply is
//! reduced to `ok` / `reason`. Anything that goes wrong resolves to `ok = true`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::decision::Decision;

/// Placeholder replaced with the event context
pub const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

const RESULT_PREVIEW_CHARS: usize = 500;
const REASON_PREVIEW_CHARS: usize = 200;

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"));

const NEGATIVE_PHRASES: &[&str] = &[
    "not complete",
    "incomplete",
    "not done",
    "not yet",
    "more work",
    "needs more",
];

const POSITIVE_PHRASES: &[&str] = &["yes", "complete", "done", "finished", "fully addressed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
}

impl CompletionResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A model that can answer a completion request
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Get provider name
    fn name(&self) -> String;

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Host capability that hands out the currently registered providers
pub trait ProviderRegistry: Send + Sync {
    fn providers(&self) -> Result<Vec<Arc<dyn ReasoningProvider>>>;
}

/// Fixed provider list
#[derive(Clone, Default)]
pub struct ProviderList(pub Vec<Arc<dyn ReasoningProvider>>);

impl ProviderRegistry for ProviderList {
    fn providers(&self) -> Result<Vec<Arc<dyn ReasoningProvider>>> {
        Ok(self.0.clone())
    }
}

/// Outcome of a prompt hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVerdict {
    pub ok: bool,
    pub reason: String,
}

impl PromptVerdict {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            reason: reason.into(),
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
        }
    }

    /// `ok` continues (reason surfaced as a user message), otherwise deny
    pub fn into_decision(self) -> Decision {
        if self.ok {
            let decision = Decision::proceed();
            if self.reason.is_empty() {
                decision
            } else {
                decision.with_user_message(self.reason)
            }
        } else if self.reason.is_empty() {
            Decision::deny("Prompt hook returned ok=false")
        } else {
            Decision::deny(self.reason)
        }
    }
}

#[derive(Clone)]
pub struct PromptEvaluator {
    registry: Option<Arc<dyn ProviderRegistry>>,
    preferred: Option<String>,
    max_output_tokens: u32,
}

impl PromptEvaluator {
    pub fn new(max_output_tokens: u32) -> Self {
        Self {
            registry: None,
            preferred: None,
            max_output_tokens,
        }
    }

    /// Look up reasoning providers in `registry`
    pub fn with_registry(mut self, registry: Arc<dyn ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use the provider with this name when it is registered
    pub fn with_preferred(mut self, name: Option<String>) -> Self {
        self.preferred = name;
        self
    }

    pub async fn evaluate(&self, template: &str, context: &Value) -> PromptVerdict {
        let prompt = expand_arguments(template, context);

        let Some(registry) = &self.registry else {
            warn!("No provider registry for prompt hook, defaulting to ok=true");
            return PromptVerdict::allow("No provider available");
        };

        let providers = match registry.providers() {
            Ok(providers) => providers,
            Err(e) => {
                warn!("Failed to get providers: {}, defaulting to ok=true", e);
                return PromptVerdict::allow("Provider access failed");
            }
        };

        let provider = self
            .preferred
            .as_ref()
            .and_then(|name| providers.iter().find(|p| &p.name() == name))
            .or_else(|| providers.first());
        let Some(provider) = provider else {
            warn!("No providers registered for prompt hook, defaulting to ok=true");
            return PromptVerdict::allow("No provider available");
        };

        let request = CompletionRequest {
            messages: vec![Message {
                role: Role::User,
                content: prompt,
            }],
            max_output_tokens: self.max_output_tokens,
        };

        match provider.complete(&request).await {
            Ok(response) if response.text.trim().is_empty() => {
                warn!("Empty response from provider, defaulting to ok=true");
                PromptVerdict::allow("Empty provider response")
            }
            Ok(response) => parse_prompt_response(&response.text),
            Err(e) => {
                warn!("Prompt hook execution failed: {}, defaulting to ok=true", e);
                PromptVerdict::allow(format!("Execution error: {}", e))
            }
        }
    }
}

/// Replace `$ARGUMENTS` with a readable summary of the event context
pub fn expand_arguments(template: &str, context: &Value) -> String {
    if !template.contains(ARGUMENTS_PLACEHOLDER) {
        return template.to_string();
    }

    let mut parts = Vec::new();
    if let Some(prompt) = context.get("prompt") {
        parts.push(format!("User prompt: {}", display_value(prompt)));
    }
    if let Some(tool) = context.get("name").or_else(|| context.get("tool_name")) {
        parts.push(format!("Tool: {}", display_value(tool)));
    }
    if let Some(input) = context.get("input") {
        parts.push(format!("Input: {}", pretty(input)));
    }
    if let Some(result) = context.get("result") {
        let mut result = pretty(result);
        if result.chars().count() > RESULT_PREVIEW_CHARS {
            result = result.chars().take(RESULT_PREVIEW_CHARS).collect::<String>() + "...";
        }
        parts.push(format!("Result: {}", result));
    }
    if let Some(trigger) = context.get("trigger") {
        parts.push(format!("Trigger: {}", display_value(trigger)));
    }

    let arguments = if parts.is_empty() {
        context.to_string()
    } else {
        parts.join("\n")
    };
    template.replace(ARGUMENTS_PLACEHOLDER, &arguments)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Reduce a free-form reply to a verdict.
///
/// Handles `{"ok": ..., "reason": ...}` anywhere in the text (including code
/// fences), then plain yes/no phrasing, and defaults to `ok = true`.
pub fn parse_prompt_response(text: &str) -> PromptVerdict {
    let text = text.trim();

    if let Some(found) = JSON_OBJECT.find(text)
        && let Ok(Value::Object(parsed)) = serde_json::from_str::<Value>(found.as_str())
    {
        let ok = match parsed.get("ok") {
            None => true,
            Some(Value::Bool(ok)) => *ok,
            Some(Value::String(s)) => {
                matches!(s.to_lowercase().as_str(), "true" | "yes" | "1" | "ok")
            }
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(_) => false,
        };
        let reason = parsed
            .get("reason")
            .map(display_value)
            .unwrap_or_default();
        return PromptVerdict { ok, reason };
    }

    let lower = text.to_lowercase();
    let preview = || text.chars().take(REASON_PREVIEW_CHARS).collect::<String>();

    if NEGATIVE_PHRASES.iter().any(|phrase| lower.contains(phrase))
        || lower.starts_with("no")
        || lower.starts_with("false")
    {
        return PromptVerdict::reject(preview());
    }

    if POSITIVE_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return PromptVerdict::allow(preview());
    }

    debug!(
        "Could not parse prompt response, defaulting to ok=true: {}",
        text.chars().take(100).collect::<String>()
    );
    PromptVerdict::allow("Could not parse response")
}
