use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default hooks directory, relative to the project root
pub const DEFAULT_HOOKS_DIR: &str = ".hookshell/hooks";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Master switch; when false every dispatch resolves to `continue`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Project root (default: current directory). `~` and `$VARS` are expanded.
    #[serde(default)]
    pub project_dir: Option<String>,

    /// Hooks directory; relative paths are anchored at the project root
    #[serde(default)]
    pub hooks_dir: Option<String>,

    /// Also load hooks from the per-user data directory
    #[serde(default = "default_true")]
    pub include_global: bool,

    /// Timeout for command hooks that do not set their own, in seconds
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Preferred reasoning provider; falls back to the first registered one
    #[serde(default)]
    pub provider: Option<String>,

    /// Output cap for prompt hook evaluations
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_max_output_tokens() -> u32 {
    256
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            project_dir: None,
            hooks_dir: None,
            include_global: true,
            default_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            provider: None,
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolved project root
    pub fn project_dir(&self) -> Result<PathBuf> {
        match &self.hooks.project_dir {
            Some(dir) => Ok(PathBuf::from(expand_path(dir)?)),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }

    /// Resolved hooks directory
    pub fn hooks_dir(&self) -> Result<PathBuf> {
        let project_dir = self.project_dir()?;
        let dir = match &self.hooks.hooks_dir {
            Some(dir) => PathBuf::from(expand_path(dir)?),
            None => PathBuf::from(DEFAULT_HOOKS_DIR),
        };
        Ok(if dir.is_absolute() {
            dir
        } else {
            project_dir.join(dir)
        })
    }

    /// Per-user hooks directory, when global hooks are enabled
    pub fn global_hooks_dir(&self) -> Option<PathBuf> {
        if !self.hooks.include_global {
            return None;
        }
        ProjectDirs::from("dev", "hookshell", "hookshell")
            .map(|dirs| dirs.data_dir().join("hooks"))
    }
}

fn expand_path(path: &str) -> Result<String> {
    shellexpand::full(path)
        .map(|expanded| expanded.into_owned())
        .with_context(|| format!("Failed to expand path {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.hooks.enabled);
        assert!(config.hooks.include_global);
        assert_eq!(config.hooks.default_timeout_secs, 30.0);
        assert_eq!(config.prompt.max_output_tokens, 256);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[hooks]
enabled = false
project_dir = "/srv/app"

[prompt]
provider = "local"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.hooks.enabled);
        assert_eq!(config.prompt.provider.as_deref(), Some("local"));
        assert_eq!(config.prompt.max_output_tokens, 256);
        assert_eq!(config.project_dir().unwrap(), PathBuf::from("/srv/app"));
        assert_eq!(
            config.hooks_dir().unwrap(),
            PathBuf::from("/srv/app/.hookshell/hooks")
        );
    }

    #[test]
    fn test_absolute_hooks_dir() {
        let mut config = Config::default();
        config.hooks.project_dir = Some("/srv/app".to_string());
        config.hooks.hooks_dir = Some("/etc/hooks".to_string());
        assert_eq!(config.hooks_dir().unwrap(), PathBuf::from("/etc/hooks"));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[hooks\nenabled = ").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_global_dir_disabled() {
        let mut config = Config::default();
        config.hooks.include_global = false;
        assert!(config.global_hooks_dir().is_none());
    }
}
