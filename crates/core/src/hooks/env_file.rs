//! Session-scoped environment file shared between hook processes
//!
//! Hooks append `KEY=value` (or `export KEY=value`) lines to the file named by
//! `HOOKSHELL_ENV_FILE`; the executor reads it back after every run so later
//! hooks in the same session see those variables. The file itself is not
//! locked: hooks running in parallel may interleave their writes.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};
use uuid::Uuid;

/// Key/value pairs hooks persist for the rest of a session, backed by one temp file
pub struct PersistedEnvironment {
    session_id: String,
    path: Mutex<Option<PathBuf>>,
    vars: Mutex<HashMap<String, String>>,
}

impl PersistedEnvironment {
    /// Create an empty store; the backing file is created on first [`path`](Self::path)
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            path: Mutex::new(None),
            vars: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the backing file, creating it on first access
    pub fn path(&self) -> io::Result<PathBuf> {
        let mut guard = lock(&self.path);
        if let Some(path) = guard.as_ref() {
            return Ok(path.clone());
        }

        let prefix: String = self
            .session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .take(8)
            .collect();
        let path = std::env::temp_dir().join(format!(
            "hookshell-env-{}-{}.env",
            prefix,
            Uuid::new_v4().simple()
        ));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        debug!("Created hook env file {}", path.display());

        *guard = Some(path.clone());
        Ok(path)
    }

    /// Current key/value pairs
    pub fn vars(&self) -> HashMap<String, String> {
        lock(&self.vars).clone()
    }

    /// Get a single persisted value
    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.vars).get(key).cloned()
    }

    /// Re-read the backing file and merge its pairs (last write wins)
    pub fn reload(&self) {
        let Some(path) = lock(&self.path).clone() else {
            return;
        };

        // A stray non-UTF-8 byte must not hide the pairs around it
        let content = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!("Failed to read hook env file {}: {}", path.display(), e);
                return;
            }
        };

        let parsed = parse_env_file(&content);
        if parsed.is_empty() {
            return;
        }
        let mut vars = lock(&self.vars);
        for (key, value) in parsed {
            vars.insert(key, value);
        }
    }

    /// Delete the backing file. Safe to call more than once.
    pub fn cleanup(&self) {
        if let Some(path) = lock(&self.path).take()
            && let Err(e) = fs::remove_file(&path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("Failed to remove hook env file {}: {}", path.display(), e);
        }
    }
}

impl Drop for PersistedEnvironment {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Poisoning only means another hook task panicked mid-update; the map is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Parse `KEY=value` lines, ignoring blanks, comments and lines without `=`.
/// Pairs containing a NUL byte are dropped: they cannot be passed to a child
/// process and would make every later spawn fail.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            if key.contains('\0') || value.contains('\0') {
                warn!("Ignoring env file entry '{}' containing a NUL byte", key.escape_default());
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_file() {
        let parsed = parse_env_file(
            "# comment\n\nexport FOO=bar\nBAZ=\"a b\"\n  QUX = 'single'  \nnot a pair\nEMPTY=\nURL=http://x?a=b\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("FOO".to_string(), "bar".to_string()),
                ("BAZ".to_string(), "a b".to_string()),
                ("QUX".to_string(), "single".to_string()),
                ("EMPTY".to_string(), String::new()),
                ("URL".to_string(), "http://x?a=b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unquote_strips_one_layer_only() {
        assert_eq!(unquote("\"'inner'\""), "'inner'");
        assert_eq!(unquote("\"mismatched'"), "\"mismatched'");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_file_created_lazily_and_reloaded() {
        let env = PersistedEnvironment::new("session-1234567890");
        assert!(env.vars().is_empty());

        let path = env.path().unwrap();
        assert!(path.exists());
        assert_eq!(env.path().unwrap(), path);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("hookshell-env-session-"));
        assert!(name.ends_with(".env"));

        fs::write(&path, "export FOO=bar\nFOO=baz\n").unwrap();
        env.reload();
        assert_eq!(env.get("FOO").as_deref(), Some("baz"));

        env.cleanup();
        assert!(!path.exists());
        env.cleanup();
    }

    #[test]
    fn test_parse_skips_nul_bytes() {
        let parsed = parse_env_file("export BAD=a\0b\nNUL\0KEY=x\nGOOD=yes\n");
        assert_eq!(parsed, vec![("GOOD".to_string(), "yes".to_string())]);
    }

    #[test]
    fn test_reload_survives_invalid_utf8() {
        let env = PersistedEnvironment::new("latin1");
        let path = env.path().unwrap();
        fs::write(&path, b"export A=caf\xe9\nexport GOOD=yes\n").unwrap();

        env.reload();
        assert_eq!(env.get("GOOD").as_deref(), Some("yes"));
        assert_eq!(env.get("A").as_deref(), Some("caf\u{FFFD}"));
        env.cleanup();
    }

    #[test]
    fn test_reload_without_file_is_noop() {
        let env = PersistedEnvironment::new("s");
        env.reload();
        assert!(env.vars().is_empty());
    }

    #[test]
    fn test_session_prefix_is_sanitized() {
        let env = PersistedEnvironment::new("../../etc");
        let path = env.path().unwrap();
        assert_eq!(path.parent().unwrap(), std::env::temp_dir());
    }
}
