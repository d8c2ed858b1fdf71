//! Aggregated hook outcome handed back to the host

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Proceed normally
    #[default]
    Continue,
    /// Block the operation
    Deny,
    /// Replace the operation's content
    Modify,
    /// Add text to the agent's context
    InjectContext,
}

/// Decision returned by hook execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Message to surface to the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_injection: Option<String>,

    /// `{"modified_content": ...}` for [`Action::Modify`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Decision {
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Deny,
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn inject_context(text: impl Into<String>) -> Self {
        Self {
            action: Action::InjectContext,
            context_injection: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn modify(content: Value) -> Self {
        Self {
            action: Action::Modify,
            data: Some(serde_json::json!({ "modified_content": content })),
            ..Self::default()
        }
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    /// Deny, modify and inject_context stop further hook execution
    pub fn is_blocking(&self) -> bool {
        self.action != Action::Continue
    }

    pub fn is_allowed(&self) -> bool {
        self.action != Action::Deny
    }

    pub fn modified_content(&self) -> Option<&Value> {
        self.data.as_ref()?.get("modified_content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_continue() {
        let decision = Decision::default();
        assert_eq!(decision.action, Action::Continue);
        assert!(!decision.is_blocking());
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_blocking_actions() {
        assert!(Decision::deny("no").is_blocking());
        assert!(!Decision::deny("no").is_allowed());
        assert!(Decision::inject_context("ctx").is_blocking());
        assert!(Decision::modify(json!("x")).is_blocking());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(
            Decision::inject_context("Lint errors").with_user_message("Issues detected"),
        )
        .unwrap();
        assert_eq!(
            json,
            json!({
                "action": "inject_context",
                "user_message": "Issues detected",
                "context_injection": "Lint errors"
            })
        );

        let modified = Decision::modify(json!({"text": "new"}));
        assert_eq!(modified.modified_content(), Some(&json!({"text": "new"})));
    }
}
