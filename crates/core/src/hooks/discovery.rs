//! Hook configuration types and discovery from the filesystem

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// File name looked up in the hooks directory and each of its subdirectories
pub const HOOKS_FILE: &str = "hooks.json";

/// Default timeout for command hooks, in seconds
pub const DEFAULT_HOOK_TIMEOUT_SECS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Per-event hook configuration, keyed by canonical event name (e.g. `PreToolUse`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookSettings {
    #[serde(default)]
    pub hooks: BTreeMap<String, Vec<MatcherSpec>>,
}

/// One matcher entry as written in `hooks.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherSpec {
    /// Tool name / trigger pattern; `""` and `"*"` match everything
    #[serde(default = "default_matcher")]
    pub matcher: String,

    /// Run this entry's hooks concurrently
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub parallel: bool,

    #[serde(default)]
    pub hooks: Vec<HookSpec>,
}

/// A single hook as written in `hooks.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    /// `command` or `prompt`; anything else is carried through and skipped at run time
    #[serde(rename = "type", default = "default_hook_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Timeout in seconds (command hooks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

fn default_matcher() -> String {
    "*".to_string()
}

fn default_hook_type() -> String {
    "command".to_string()
}

impl MatcherSpec {
    pub fn new(matcher: impl Into<String>, hooks: Vec<HookSpec>) -> Self {
        Self {
            matcher: matcher.into(),
            parallel: false,
            hooks,
        }
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }
}

impl HookSpec {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: "command".to_string(),
            command: Some(command.into()),
            prompt: None,
            timeout: None,
        }
    }

    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            kind: "prompt".to_string(),
            command: None,
            prompt: Some(prompt.into()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

impl HookSettings {
    /// Parse a per-event map (the value under the top-level `hooks` key)
    pub fn from_event_map(value: &Value) -> Result<Self, serde_json::Error> {
        let hooks = serde_json::from_value(normalize_event_map(value))?;
        Ok(Self { hooks })
    }

    /// Number of configured events
    pub fn event_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(|entries| entries.is_empty())
    }

    /// Append every event's entries from `other` after this one's
    pub fn merge(&mut self, other: HookSettings) {
        for (event, entries) in other.hooks {
            self.hooks.entry(event).or_default().extend(entries);
        }
    }
}

/// Accept a single matcher object where a list is expected
fn normalize_event_map(value: &Value) -> Value {
    let Some(events) = value.as_object() else {
        return value.clone();
    };

    let normalized: Map<String, Value> = events
        .iter()
        .map(|(event, matchers)| {
            let list = match matchers {
                Value::Array(_) => matchers.clone(),
                other => Value::Array(vec![other.clone()]),
            };
            (event.clone(), list)
        })
        .collect();

    Value::Object(normalized)
}

/// Discover and merge hook settings from the project and (optional) global hooks directories
///
/// Looks in, for each directory:
/// - dir/hooks.json
/// - dir/*/hooks.json (sorted by subdirectory name)
///
/// Files that fail to load are skipped with a warning.
pub fn discover_settings(hooks_dir: &Path, global_dir: Option<&Path>) -> HookSettings {
    let mut settings = HookSettings::default();

    let found = load_settings_from_dir(hooks_dir);
    debug!(
        "Found {} hook events in {}",
        found.event_count(),
        hooks_dir.display()
    );
    settings.merge(found);

    if let Some(global_dir) = global_dir {
        let found = load_settings_from_dir(global_dir);
        debug!("Found {} global hook events", found.event_count());
        settings.merge(found);
    }

    settings
}

/// Load and merge every `hooks.json` in a directory and its immediate subdirectories
pub fn load_settings_from_dir(dir: &Path) -> HookSettings {
    let mut settings = HookSettings::default();
    if !dir.is_dir() {
        return settings;
    }

    let mut files = Vec::new();
    let root_file = dir.join(HOOKS_FILE);
    if root_file.is_file() {
        files.push(root_file);
    }

    let mut subdirs: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(e) => {
            warn!("Failed to read hooks directory {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    subdirs.sort();
    files.extend(
        subdirs
            .into_iter()
            .map(|subdir| subdir.join(HOOKS_FILE))
            .filter(|file| file.is_file()),
    );

    for file in files {
        match load_settings_file(&file) {
            Ok(found) => settings.merge(found),
            Err(e) => warn!("Failed to load hooks: {}", e),
        }
    }

    settings
}

/// Load a single `hooks.json` file
pub fn load_settings_file(path: &Path) -> Result<HookSettings, DiscoveryError> {
    let content = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json_err = |source| DiscoveryError::Json {
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(&content).map_err(json_err)?;
    match value.get("hooks") {
        Some(events) => HookSettings::from_event_map(events).map_err(json_err),
        None => Ok(HookSettings::default()),
    }
}
