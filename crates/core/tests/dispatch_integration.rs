//! End-to-end dispatch through real `sh` hook processes
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use hookshell_core::Config;
use hookshell_core::hooks::{Action, Dispatcher, HookSettings, HookSpec, MatcherSpec};
use serde_json::json;
use tempfile::TempDir;

/// Write a script into the project dir and return the command that runs it
fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("{}\n", body)).unwrap();
    format!("sh {}", path.display())
}

fn settings(event: &str, specs: Vec<MatcherSpec>) -> HookSettings {
    let mut settings = HookSettings::default();
    settings.hooks.insert(event.to_string(), specs);
    settings
}

fn dispatcher(project: &TempDir, settings: &HookSettings) -> Dispatcher {
    Dispatcher::new(project.path(), project.path().join("hooks"), settings)
}

#[tokio::test]
async fn test_exit_code_two_blocks_and_stops() {
    let project = TempDir::new().unwrap();
    let guard = script(
        project.path(),
        "guard.sh",
        r#"input=$(cat)
case "$input" in
  *"rm -rf"*) echo "Dangerous command blocked" >&2; exit 2 ;;
esac
exit 0"#,
    );
    let marker = script(project.path(), "marker.sh", "touch ran-after-guard");

    let settings = settings(
        "PreToolUse",
        vec![MatcherSpec::new("Bash", vec![HookSpec::command(guard), HookSpec::command(marker)])],
    );
    let dispatcher = dispatcher(&project, &settings);

    let decision = dispatcher
        .dispatch("tool:pre", &json!({"name": "Bash", "input": {"command": "rm -rf /"}}))
        .await;
    assert_eq!(decision.action, Action::Deny);
    assert_eq!(decision.reason.as_deref(), Some("Dangerous command blocked"));
    assert!(!project.path().join("ran-after-guard").exists());

    let decision = dispatcher
        .dispatch("tool:pre", &json!({"name": "Bash", "input": {"command": "ls"}}))
        .await;
    assert_eq!(decision.action, Action::Continue);
    assert!(project.path().join("ran-after-guard").exists());

    dispatcher.cleanup();
}

#[tokio::test]
async fn test_timed_out_hook_fails_open() {
    let project = TempDir::new().unwrap();
    let slow = script(project.path(), "slow.sh", "sleep 5");
    let after = script(project.path(), "after.sh", "touch after-timeout");

    let settings = settings(
        "PreToolUse",
        vec![MatcherSpec::new(
            "*",
            vec![HookSpec::command(slow).with_timeout(0.3), HookSpec::command(after)],
        )],
    );
    let dispatcher = dispatcher(&project, &settings);

    let started = Instant::now();
    let decision = dispatcher.dispatch("tool:pre", &json!({"name": "Bash"})).await;
    assert_eq!(decision.action, Action::Continue);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(project.path().join("after-timeout").exists());

    dispatcher.cleanup();
}

#[tokio::test]
async fn test_persisted_variables_reach_later_dispatches() {
    let project = TempDir::new().unwrap();
    let setup = script(
        project.path(),
        "setup.sh",
        r#"echo "export DEPLOY_STAGE=staging" >> "$HOOKSHELL_ENV_FILE""#,
    );
    let report = script(
        project.path(),
        "report.sh",
        r#"printf '{"contextInjection": "stage=%s session=%s"}' "$DEPLOY_STAGE" "$CLAUDE_SESSION_ID""#,
    );

    let mut settings = settings(
        "SessionStart",
        vec![MatcherSpec::new("startup", vec![HookSpec::command(setup)])],
    );
    settings.hooks.insert(
        "UserPromptSubmit".to_string(),
        vec![MatcherSpec::new("*", vec![HookSpec::command(report)])],
    );
    let dispatcher = dispatcher(&project, &settings);

    let decision = dispatcher
        .dispatch("session:start", &json!({"session_id": "sess-42"}))
        .await;
    assert_eq!(decision.action, Action::Continue);

    let decision = dispatcher
        .dispatch("prompt:submit", &json!({"prompt": "deploy", "session_id": "other"}))
        .await;
    assert_eq!(decision.action, Action::InjectContext);
    assert_eq!(
        decision.context_injection.as_deref(),
        Some("stage=staging session=sess-42")
    );

    dispatcher.cleanup();
}

#[tokio::test]
async fn test_unusable_env_entries_do_not_disable_guards() {
    let project = TempDir::new().unwrap();
    let poison = script(
        project.path(),
        "poison.sh",
        r#"printf 'export BAD=a\000b\nexport LATER=kept\n' >> "$HOOKSHELL_ENV_FILE""#,
    );
    let guard = script(
        project.path(),
        "guard.sh",
        r#"echo "guard saw LATER=$LATER" >&2; exit 2"#,
    );

    let settings = settings(
        "PreToolUse",
        vec![MatcherSpec::new("*", vec![HookSpec::command(poison), HookSpec::command(guard)])],
    );
    let dispatcher = dispatcher(&project, &settings);

    for _ in 0..2 {
        let decision = dispatcher.dispatch("tool:pre", &json!({"name": "Bash"})).await;
        assert_eq!(decision.action, Action::Deny);
        assert_eq!(decision.reason.as_deref(), Some("guard saw LATER=kept"));
    }

    dispatcher.cleanup();
}

#[tokio::test]
async fn test_parallel_hooks_run_concurrently() {
    let project = TempDir::new().unwrap();
    let hooks: Vec<HookSpec> = (0..3)
        .map(|i| {
            HookSpec::command(script(
                project.path(),
                &format!("p{}.sh", i),
                &format!("sleep 0.5; touch done-{}", i),
            ))
        })
        .collect();
    let settings = settings("PostToolUse", vec![MatcherSpec::new("Edit", hooks).parallel()]);
    let dispatcher = dispatcher(&project, &settings);

    let started = Instant::now();
    let decision = dispatcher.dispatch("tool:post", &json!({"name": "Edit"})).await;
    let elapsed = started.elapsed();
    assert_eq!(decision.action, Action::Continue);
    for i in 0..3 {
        assert!(project.path().join(format!("done-{}", i)).exists());
    }
    // Run one after another this would take at least 1.5s
    assert!(elapsed < Duration::from_millis(1200), "took {:?}", elapsed);

    dispatcher.cleanup();
}

#[tokio::test]
async fn test_from_config_discovers_hooks() {
    let project = TempDir::new().unwrap();
    let hooks_dir = project.path().join(".hookshell/hooks/protect");
    fs::create_dir_all(&hooks_dir).unwrap();
    fs::write(
        hooks_dir.join("hooks.json"),
        r#"{
  "hooks": {
    "PreToolUse": [
      {
        "matcher": "Edit|Write",
        "hooks": [
          {
            "type": "command",
            "command": "echo '{\"decision\": \"block\", \"reason\": \"File is protected\"}'"
          }
        ]
      }
    ]
  }
}"#,
    )
    .unwrap();

    let mut config = Config::default();
    config.hooks.project_dir = Some(project.path().display().to_string());
    config.hooks.include_global = false;

    let dispatcher = Dispatcher::from_config(&config).unwrap();
    assert_eq!(dispatcher.hooks_dir(), project.path().join(".hookshell/hooks"));

    let decision = dispatcher.dispatch("tool:pre", &json!({"name": "write"})).await;
    assert_eq!(decision.action, Action::Deny);
    assert_eq!(decision.reason.as_deref(), Some("File is protected"));

    let decision = dispatcher.dispatch("tool:pre", &json!({"name": "Read"})).await;
    assert_eq!(decision.action, Action::Continue);

    dispatcher.cleanup();
}

#[tokio::test]
async fn test_disabled_in_config() {
    let project = TempDir::new().unwrap();
    let mut config = Config::default();
    config.hooks.project_dir = Some(project.path().display().to_string());
    config.hooks.include_global = false;
    config.hooks.enabled = false;

    let dispatcher = Dispatcher::from_config(&config).unwrap();
    assert!(!dispatcher.is_enabled());
    let decision = dispatcher.dispatch("tool:pre", &json!({"name": "Bash"})).await;
    assert_eq!(decision.action, Action::Continue);
}
