//! Environment variable constants used throughout the application.
//!
//! Centralized definition of all `HOOKSHELL_*` environment variables, plus the
//! `CLAUDE_*` aliases exported to hook processes so existing hook scripts keep
//! working unchanged.

/// Configuration file path override (CLI arg default env)
pub const HOOKSHELL_CONFIG: &str = "HOOKSHELL_CONFIG";

/// Project root exported to hook processes
pub const HOOKSHELL_PROJECT_DIR: &str = "HOOKSHELL_PROJECT_DIR";

/// Alias of [`HOOKSHELL_PROJECT_DIR`]
pub const CLAUDE_PROJECT_DIR: &str = "CLAUDE_PROJECT_DIR";

/// Hook configuration directory exported to hook processes
pub const HOOKSHELL_HOOKS_DIR: &str = "HOOKSHELL_HOOKS_DIR";

/// Alias of [`HOOKSHELL_HOOKS_DIR`]
pub const CLAUDE_HOOKS_DIR: &str = "CLAUDE_HOOKS_DIR";

/// Session identifier exported to hook processes
pub const HOOKSHELL_SESSION_ID: &str = "HOOKSHELL_SESSION_ID";

/// Alias of [`HOOKSHELL_SESSION_ID`]
pub const CLAUDE_SESSION_ID: &str = "CLAUDE_SESSION_ID";

/// Path of the persisted-environment file hooks may append `KEY=value` lines to
pub const HOOKSHELL_ENV_FILE: &str = "HOOKSHELL_ENV_FILE";

/// Alias of [`HOOKSHELL_ENV_FILE`]
pub const CLAUDE_ENV_FILE: &str = "CLAUDE_ENV_FILE";
