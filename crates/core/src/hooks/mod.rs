//! Lifecycle hook dispatch
//!
//! Hooks are external commands (or natural-language prompts) that fire at
//! key points of an agent session:
//! - PreToolUse: Before a tool executes (can block)
//! - PostToolUse: After a tool completes
//! - UserPromptSubmit: When the user submits a prompt
//! - SessionStart / SessionEnd: Session lifecycle (matched on the trigger)
//! - Stop, PreCompact, PermissionRequest, Notification
//!
//! Hook definitions are `hooks.json` files in:
//! - <project>/.hookshell/hooks/hooks.json and <project>/.hookshell/hooks/*/hooks.json
//! - <data dir>/hookshell/hooks (global)
//!
//! Example hook file:
//! ```json
//! {
//!   "hooks": {
//!     "PreToolUse": [
//!       {
//!         "matcher": "Bash|Edit",
//!         "hooks": [{ "type": "command", "command": "./check.sh", "timeout": 10 }]
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! The event JSON is piped to the hook command's stdin. Exit code 2 blocks
//! the operation (stderr is the reason); a JSON object on stdout can block,
//! inject context or replace content. Any failure lets the operation proceed.

mod decision;
mod discovery;
mod dispatcher;
mod env_file;
mod event;
mod executor;
mod matcher;
mod prompt;
mod registry;
mod translator;

pub use decision::{Action, Decision};
pub use discovery::{
    DEFAULT_HOOK_TIMEOUT_SECS, DiscoveryError, HOOKS_FILE, HookSettings, HookSpec, MatcherSpec,
    discover_settings, load_settings_file, load_settings_from_dir,
};
pub use dispatcher::{Dispatcher, HANDLER_PRIORITY, Mount, ScopedHandlerSet};
pub use env_file::{PersistedEnvironment, parse_env_file};
pub use event::{CanonicalEvent, host};
pub use executor::{ExecError, HookExecutor, ProcessExecutor, ProcessOutput};
pub use matcher::{Handler, Matcher, MatcherEntry, MatcherGroup};
pub use prompt::{
    CompletionRequest, CompletionResponse, Message, PromptEvaluator, PromptVerdict,
    ProviderList, ProviderRegistry, ReasoningProvider, Role, expand_arguments,
    parse_prompt_response,
};
pub use registry::{EventBus, HandlerFuture, HookRegistry, HostHandler, Unregister};
pub use translator::{DENY_EXIT_CODE, from_process_result, to_wire_format};
