//! Tool name / trigger routing for hook entries

use std::time::Duration;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::discovery::{DEFAULT_HOOK_TIMEOUT_SECS, HookSpec, MatcherSpec};

/// A compiled matcher pattern
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    kind: MatcherKind,
}

#[derive(Debug, Clone)]
enum MatcherKind {
    All,
    Regex(Regex),
    /// Pattern did not compile; compared case-insensitively as a literal
    Exact,
}

impl Matcher {
    pub fn new(pattern: &str) -> Self {
        let kind = if pattern.is_empty() || pattern == "*" {
            MatcherKind::All
        } else {
            // Validate the bare pattern, then anchor so the whole target has to match
            let compiled = Regex::new(pattern).and_then(|_| {
                RegexBuilder::new(&format!("^(?:{})$", pattern))
                    .case_insensitive(true)
                    .build()
            });
            match compiled {
                Ok(regex) => MatcherKind::Regex(regex),
                Err(e) => {
                    // The regex dialect has no lookaround or backreferences
                    warn!("Matcher '{}' is not a supported regex ({}), using exact match", pattern, e);
                    MatcherKind::Exact
                }
            }
        };

        Self {
            pattern: pattern.to_string(),
            kind,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, target: &str) -> bool {
        match &self.kind {
            MatcherKind::All => true,
            MatcherKind::Regex(regex) => regex.is_match(target),
            MatcherKind::Exact => target.to_lowercase() == self.pattern.to_lowercase(),
        }
    }
}

/// A runnable hook
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    /// Shell command fed the event JSON on stdin
    Command { command: String, timeout: Duration },
    /// Natural-language check evaluated by a reasoning provider
    Prompt { prompt: String },
    /// Configuration entry that cannot be run (unknown type or missing body)
    Unsupported(String),
}

impl Handler {
    pub fn from_spec(spec: &HookSpec) -> Self {
        match spec.kind.as_str() {
            "command" => match spec.command.as_deref().filter(|c| !c.is_empty()) {
                Some(command) => Handler::Command {
                    command: command.to_string(),
                    timeout: timeout_from_secs(spec.timeout.unwrap_or(DEFAULT_HOOK_TIMEOUT_SECS)),
                },
                None => Handler::Unsupported("command hook without a command".to_string()),
            },
            "prompt" => match spec.prompt.as_deref().filter(|p| !p.is_empty()) {
                Some(prompt) => Handler::Prompt {
                    prompt: prompt.to_string(),
                },
                None => Handler::Unsupported("prompt hook without a prompt".to_string()),
            },
            other => Handler::Unsupported(format!("unknown hook type '{}'", other)),
        }
    }

    /// Short human-readable description for logs and listings
    pub fn summary(&self) -> String {
        match self {
            Handler::Command { command, timeout } => {
                format!("command: {} ({}s)", command, timeout.as_secs_f64())
            }
            Handler::Prompt { prompt } => {
                format!("prompt: {}", prompt.chars().take(50).collect::<String>())
            }
            Handler::Unsupported(why) => format!("skipped: {}", why),
        }
    }
}

/// Negative, NaN or overflowing timeouts fall back to the default
fn timeout_from_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds)
        .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_HOOK_TIMEOUT_SECS))
}

/// One matcher with the handlers it routes to
#[derive(Debug, Clone)]
pub struct MatcherEntry {
    pub matcher: Matcher,
    pub handlers: Vec<Handler>,
    pub parallel: bool,
}

/// Ordered matcher entries for a single event
#[derive(Debug, Clone, Default)]
pub struct MatcherGroup {
    entries: Vec<MatcherEntry>,
}

impl MatcherGroup {
    /// Build from configuration; entries without hooks are dropped
    pub fn new(specs: &[MatcherSpec]) -> Self {
        let entries = specs
            .iter()
            .filter(|spec| !spec.hooks.is_empty())
            .map(|spec| MatcherEntry {
                matcher: Matcher::new(&spec.matcher),
                handlers: spec.hooks.iter().map(Handler::from_spec).collect(),
                parallel: spec.parallel,
            })
            .collect();
        Self { entries }
    }

    /// Every entry whose pattern matches `target`, in declaration order
    pub fn matching_entries(&self, target: &str) -> Vec<&MatcherEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.matcher.matches(target))
            .collect()
    }

    /// Handlers of every matching entry, flattened in declaration order
    pub fn matching_handlers(&self, target: &str) -> Vec<&Handler> {
        self.matching_entries(target)
            .into_iter()
            .flat_map(|entry| entry.handlers.iter())
            .collect()
    }

    pub fn entries(&self) -> &[MatcherEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(handlers: &[&Handler]) -> Vec<String> {
        handlers
            .iter()
            .map(|h| match h {
                Handler::Command { command, .. } => command.clone(),
                other => panic!("unexpected handler {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let matcher = Matcher::new("Bash");
        assert!(matcher.matches("Bash"));
        assert!(matcher.matches("bash"));
        assert!(matcher.matches("BASH"));
        assert!(!matcher.matches("Edit"));
    }

    #[test]
    fn test_alternation() {
        let matcher = Matcher::new("Edit|Write");
        assert!(matcher.matches("Edit"));
        assert!(matcher.matches("Write"));
        assert!(!matcher.matches("Read"));
        assert!(!matcher.matches("EditWrite"));
    }

    #[test]
    fn test_match_all_patterns() {
        for pattern in ["*", ""] {
            let matcher = Matcher::new(pattern);
            assert!(matcher.matches("Bash"));
            assert!(matcher.matches(""));
            assert!(matcher.matches("anything at all"));
        }
    }

    #[test]
    fn test_full_string_match() {
        let matcher = Matcher::new("Notebook.*");
        assert!(matcher.matches("NotebookCreate"));
        assert!(matcher.matches("Notebook"));

        let one_plus = Matcher::new("Notebook.+");
        assert!(one_plus.matches("NotebookCreate"));
        assert!(!one_plus.matches("Notebook"));

        // Substrings do not count
        assert!(!Matcher::new("Bash").matches("BashOutput"));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_exact() {
        let matcher = Matcher::new("mcp__server[");
        assert!(matcher.matches("MCP__server["));
        assert!(!matcher.matches("mcp__server"));
    }

    #[test]
    fn test_lookaround_is_not_supported() {
        let matcher = Matcher::new("(?!Read).*");
        assert!(!matcher.matches("Bash"));
        assert!(matcher.matches("(?!read).*"));
    }

    #[test]
    fn test_group_preserves_order_and_returns_all_matches() {
        let group = MatcherGroup::new(&[
            MatcherSpec::new("*", vec![HookSpec::command("echo all")]),
            MatcherSpec::new("Bash", vec![HookSpec::command("echo bash")]).parallel(),
            MatcherSpec::new("Edit|Write", vec![HookSpec::command("echo edit")]),
        ]);

        let entries = group.matching_entries("Bash");
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].parallel);
        assert!(entries[1].parallel);

        assert_eq!(
            commands(&group.matching_handlers("Bash")),
            vec!["echo all", "echo bash"]
        );
        assert_eq!(
            commands(&group.matching_handlers("write")),
            vec!["echo all", "echo edit"]
        );
    }

    #[test]
    fn test_group_drops_entries_without_hooks() {
        let group = MatcherGroup::new(&[
            MatcherSpec::new("Bash", vec![]),
            MatcherSpec::new("Edit", vec![HookSpec::command("echo 2")]),
        ]);
        assert_eq!(group.len(), 1);
        assert!(group.matching_entries("Bash").is_empty());
        assert!(group.matching_entries("Read").is_empty());
    }

    #[test]
    fn test_handler_from_spec() {
        assert_eq!(
            Handler::from_spec(&HookSpec::command("slow.sh").with_timeout(60.0)),
            Handler::Command {
                command: "slow.sh".to_string(),
                timeout: Duration::from_secs(60),
            }
        );
        assert_eq!(
            Handler::from_spec(&HookSpec::command("check.sh")),
            Handler::Command {
                command: "check.sh".to_string(),
                timeout: Duration::from_secs(30),
            }
        );
        assert!(matches!(
            Handler::from_spec(&HookSpec::command("x").with_timeout(-1.0)),
            Handler::Command { timeout, .. } if timeout == Duration::from_secs(30)
        ));
        assert!(matches!(
            Handler::from_spec(&HookSpec::prompt("Is it done?")),
            Handler::Prompt { .. }
        ));

        let mut script = HookSpec::command("test.py");
        script.kind = "script".to_string();
        assert!(matches!(Handler::from_spec(&script), Handler::Unsupported(_)));
    }
}
