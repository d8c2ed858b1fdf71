//! Hook process execution

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::env_file::PersistedEnvironment;
use crate::env::{
    CLAUDE_ENV_FILE, CLAUDE_HOOKS_DIR, CLAUDE_PROJECT_DIR, CLAUDE_SESSION_ID, HOOKSHELL_ENV_FILE,
    HOOKSHELL_HOOKS_DIR, HOOKSHELL_PROJECT_DIR, HOOKSHELL_SESSION_ID,
};

/// Raw result of one hook process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Failed invocation; the non-JSON output resolves to `continue`
    fn failed(err: &ExecError) -> Self {
        Self::new(1, "", err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Hook timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
    #[error("Hook execution failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Hook execution failed: cannot serialize input: {0}")]
    Input(#[from] serde_json::Error),
}

/// Runs a hook command and reports how it exited.
///
/// Implementations never fail: every problem is folded into the returned
/// [`ProcessOutput`] so the translator can fail open.
#[async_trait]
pub trait HookExecutor: Send + Sync {
    async fn execute(&self, command: &str, input: &Value, timeout: Duration) -> ProcessOutput;

    /// Release per-session resources
    fn cleanup(&self) {}
}

/// Executes hooks as `sh -c` subprocesses
pub struct ProcessExecutor {
    project_dir: PathBuf,
    hooks_dir: PathBuf,
    session_id: String,
    env: PersistedEnvironment,
}

impl ProcessExecutor {
    pub fn new(project_dir: &Path, hooks_dir: &Path, session_id: &str) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            hooks_dir: hooks_dir.to_path_buf(),
            session_id: session_id.to_string(),
            env: PersistedEnvironment::new(session_id),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn persisted_env(&self) -> &PersistedEnvironment {
        &self.env
    }

    /// Variables layered over the inherited environment, lowest precedence first
    pub fn prepare_environment(&self) -> std::io::Result<Vec<(String, String)>> {
        let project_dir = self.project_dir.display().to_string();
        let hooks_dir = self.hooks_dir.display().to_string();
        let env_file = self.env.path()?.display().to_string();

        let mut vars = vec![
            (HOOKSHELL_PROJECT_DIR.to_string(), project_dir.clone()),
            (CLAUDE_PROJECT_DIR.to_string(), project_dir),
            (HOOKSHELL_HOOKS_DIR.to_string(), hooks_dir.clone()),
            (CLAUDE_HOOKS_DIR.to_string(), hooks_dir),
            (HOOKSHELL_SESSION_ID.to_string(), self.session_id.clone()),
            (CLAUDE_SESSION_ID.to_string(), self.session_id.clone()),
            (HOOKSHELL_ENV_FILE.to_string(), env_file.clone()),
            (CLAUDE_ENV_FILE.to_string(), env_file),
        ];
        let mut persisted: Vec<_> = self.env.vars().into_iter().collect();
        persisted.sort();
        vars.extend(persisted);
        Ok(vars)
    }

    async fn run(
        &self,
        command: &str,
        input: &Value,
        limit: Duration,
    ) -> Result<ProcessOutput, ExecError> {
        let input_json = serde_json::to_vec(input)?;
        let envs = self.prepare_environment()?;
        let command = expand_command(command);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .envs(envs)
            .current_dir(&self.project_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let feed = async move {
            if let Some(mut stdin) = stdin {
                // Hooks that never read stdin close the pipe early
                if let Err(e) = stdin.write_all(&input_json).await {
                    debug!("Hook did not consume stdin: {}", e);
                }
            }
        };

        let result = timeout(limit, async {
            let (_, stdout, stderr, status) =
                tokio::join!(feed, read_pipe(stdout), read_pipe(stderr), child.wait());
            Ok::<_, std::io::Error>((stdout?, stderr?, status?))
        })
        .await;

        match result {
            Ok(Ok((stdout, stderr, status))) => Ok(ProcessOutput {
                // Killed by a signal
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
            }),
            Ok(Err(e)) => Err(ExecError::Io(e)),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out hook: {}", e);
                }
                Err(ExecError::TimedOut(limit))
            }
        }
    }
}

#[async_trait]
impl HookExecutor for ProcessExecutor {
    async fn execute(&self, command: &str, input: &Value, timeout: Duration) -> ProcessOutput {
        let output = match self.run(command, input, timeout).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Hook '{}' failed: {}", command, e);
                ProcessOutput::failed(&e)
            }
        };

        // Pick up anything the hook persisted, whatever the outcome
        self.env.reload();
        output
    }

    fn cleanup(&self) {
        self.env.cleanup();
    }
}

/// Expand `$VAR` / `${VAR}` from the current environment; unknown variables stay as written
fn expand_command(command: &str) -> String {
    shellexpand::env_with_context_no_errors(command, |name: &str| std::env::var(name).ok())
        .into_owned()
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
