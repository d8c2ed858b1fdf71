//! hookshell core: lifecycle hook dispatch for agent hosts.
//!
//! Routes host events to shell-command and prompt hooks configured in
//! `hooks.json` files, and folds their results into one decision. The CLI
//! crate is a thin wrapper over [`hooks::Dispatcher`].

pub mod config;
pub mod env;
pub mod hooks;

pub use config::Config;
