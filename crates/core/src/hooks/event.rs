//! Hook event names: host events and the canonical names used in `hooks.json`

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host event names the dispatcher understands
pub mod host {
    pub const TOOL_PRE: &str = "tool:pre";
    pub const TOOL_POST: &str = "tool:post";
    pub const PROMPT_SUBMIT: &str = "prompt:submit";
    pub const SESSION_START: &str = "session:start";
    pub const SESSION_END: &str = "session:end";
    pub const PROMPT_COMPLETE: &str = "prompt:complete";
    pub const CONTEXT_PRE_COMPACT: &str = "context:pre_compact";
    pub const APPROVAL_REQUIRED: &str = "approval:required";
    pub const SESSION_RESUME: &str = "session:resume";
    pub const USER_NOTIFICATION: &str = "user:notification";
    pub const SKILL_LOADED: &str = "skill:loaded";
    pub const SKILL_UNLOADED: &str = "skill:unloaded";
}

/// Lifecycle events hooks can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalEvent {
    /// Before a tool executes. Can block.
    PreToolUse,
    /// After a tool completes
    PostToolUse,
    /// When the user submits a prompt
    UserPromptSubmit,
    /// When a session starts or resumes (matched on the trigger)
    SessionStart,
    /// When a session ends
    SessionEnd,
    /// When the agent finishes responding to a prompt
    Stop,
    /// Before context compaction
    PreCompact,
    /// When an operation needs user approval
    PermissionRequest,
    /// When a notification is shown to the user
    Notification,
}

impl CanonicalEvent {
    pub const ALL: [CanonicalEvent; 9] = [
        CanonicalEvent::PreToolUse,
        CanonicalEvent::PostToolUse,
        CanonicalEvent::UserPromptSubmit,
        CanonicalEvent::SessionStart,
        CanonicalEvent::SessionEnd,
        CanonicalEvent::Stop,
        CanonicalEvent::PreCompact,
        CanonicalEvent::PermissionRequest,
        CanonicalEvent::Notification,
    ];

    /// Map a host event name; `None` for events hooks never see
    pub fn from_host(host_event: &str) -> Option<Self> {
        match host_event {
            host::TOOL_PRE => Some(Self::PreToolUse),
            host::TOOL_POST => Some(Self::PostToolUse),
            host::PROMPT_SUBMIT => Some(Self::UserPromptSubmit),
            host::SESSION_START | host::SESSION_RESUME => Some(Self::SessionStart),
            host::SESSION_END => Some(Self::SessionEnd),
            host::PROMPT_COMPLETE => Some(Self::Stop),
            host::CONTEXT_PRE_COMPACT => Some(Self::PreCompact),
            host::APPROVAL_REQUIRED => Some(Self::PermissionRequest),
            host::USER_NOTIFICATION => Some(Self::Notification),
            _ => None,
        }
    }

    /// Name used as the key in `hooks.json`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::Stop => "Stop",
            Self::PreCompact => "PreCompact",
            Self::PermissionRequest => "PermissionRequest",
            Self::Notification => "Notification",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }

    /// Whether hooks for this event are meant to block or modify the operation
    pub fn supports_blocking(&self) -> bool {
        matches!(
            self,
            Self::PreToolUse | Self::UserPromptSubmit | Self::Stop | Self::PermissionRequest
        )
    }

    /// Whether hooks for this event are meant to inject context
    pub fn supports_context_injection(&self) -> bool {
        matches!(
            self,
            Self::PreToolUse
                | Self::PostToolUse
                | Self::UserPromptSubmit
                | Self::SessionStart
                | Self::PreCompact
        )
    }
}

impl fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
