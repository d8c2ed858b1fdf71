//! Hook dispatch: routes a host event to the configured hooks and reduces
//! their results into a single [`Decision`]

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use futures::future::join_all;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::decision::Decision;
use super::discovery::{HookSettings, MatcherSpec, discover_settings};
use super::event::{CanonicalEvent, host};
use super::executor::{HookExecutor, ProcessExecutor};
use super::matcher::{Handler, MatcherEntry, MatcherGroup};
use super::prompt::{PromptEvaluator, ProviderRegistry};
use super::registry::{HandlerFuture, HookRegistry, HostHandler, Unregister};
use super::translator;
use crate::config::Config;

/// Priority used when mounting on a host registry (after most native handlers)
pub const HANDLER_PRIORITY: i32 = 20;

const DEFAULT_SESSION_ID: &str = "unknown";
const DEFAULT_TRIGGER: &str = "startup";
const RESUME_TRIGGER: &str = "resume";

/// Host events the dispatcher listens to, with their registration names
const HOST_BINDINGS: &[(&str, &str)] = &[
    (host::TOOL_PRE, "shell-pre-tool"),
    (host::TOOL_POST, "shell-post-tool"),
    (host::PROMPT_SUBMIT, "shell-prompt-submit"),
    (host::SESSION_START, "shell-session-start"),
    (host::SESSION_END, "shell-session-end"),
    (host::PROMPT_COMPLETE, "shell-stop"),
    (host::CONTEXT_PRE_COMPACT, "shell-pre-compact"),
    (host::APPROVAL_REQUIRED, "shell-permission-request"),
    (host::SESSION_RESUME, "shell-session-resume"),
    (host::USER_NOTIFICATION, "shell-notification"),
];

/// Hooks contributed by one owner (a loaded skill)
#[derive(Debug)]
pub struct ScopedHandlerSet {
    owner: String,
    groups: HashMap<CanonicalEvent, MatcherGroup>,
}

impl ScopedHandlerSet {
    /// Build from settings, anchoring `./` and `../` commands at `directory`
    pub fn new(owner: &str, settings: &HookSettings, directory: Option<&Path>) -> Self {
        let groups = build_groups(settings, |specs| match directory {
            Some(dir) => resolve_relative_commands(specs, dir),
            None => specs.to_vec(),
        });
        Self {
            owner: owner.to_string(),
            groups,
        }
    }

    /// Name of the skill that contributed these hooks
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Hooks this owner contributed for `event`
    pub fn group(&self, event: CanonicalEvent) -> Option<&MatcherGroup> {
        self.groups.get(&event)
    }
}

/// Detaches a mounted dispatcher from its registry
pub struct Mount {
    unregisters: Vec<Unregister>,
}

impl Mount {
    /// Number of host events still registered
    pub fn len(&self) -> usize {
        self.unregisters.len()
    }

    /// True once nothing is registered
    pub fn is_empty(&self) -> bool {
        self.unregisters.is_empty()
    }

    /// Remove every registration made by [`Dispatcher::mount`]
    pub fn unmount(self) {
        for unregister in self.unregisters {
            unregister();
        }
    }
}

/// Routes host events to base and scoped hooks for one session
pub struct Dispatcher {
    enabled: bool,
    project_dir: PathBuf,
    hooks_dir: PathBuf,
    groups: HashMap<CanonicalEvent, MatcherGroup>,
    scoped: RwLock<Vec<Arc<ScopedHandlerSet>>>,
    executor: OnceLock<Arc<dyn HookExecutor>>,
    prompts: Arc<PromptEvaluator>,
}

impl Dispatcher {
    /// Create a dispatcher from already discovered hook settings
    pub fn new(
        project_dir: impl Into<PathBuf>,
        hooks_dir: impl Into<PathBuf>,
        settings: &HookSettings,
    ) -> Self {
        let groups = build_groups(settings, |specs| specs.to_vec());
        let configured: usize = groups.values().map(MatcherGroup::len).sum();
        info!(
            "Loaded {} hook matcher(s) across {} event(s)",
            configured,
            groups.len()
        );

        Self {
            enabled: true,
            project_dir: project_dir.into(),
            hooks_dir: hooks_dir.into(),
            groups,
            scoped: RwLock::new(Vec::new()),
            executor: OnceLock::new(),
            prompts: Arc::new(PromptEvaluator::new(256)),
        }
    }

    /// Discover hook settings from the configured directories
    pub fn from_config(config: &Config) -> Result<Self> {
        let project_dir = config.project_dir()?;
        let hooks_dir = config.hooks_dir()?;
        let global_dir = config.global_hooks_dir();

        let mut settings = discover_settings(&hooks_dir, global_dir.as_deref());
        for hook in settings
            .hooks
            .values_mut()
            .flatten()
            .flat_map(|entry| entry.hooks.iter_mut())
        {
            hook.timeout.get_or_insert(config.hooks.default_timeout_secs);
        }

        let prompts = PromptEvaluator::new(config.prompt.max_output_tokens)
            .with_preferred(config.prompt.provider.clone());

        Ok(Self::new(project_dir, hooks_dir, &settings)
            .with_enabled(config.hooks.enabled)
            .with_prompt_evaluator(prompts))
    }

    /// A disabled dispatcher answers every event with `continue`
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Use `executor` instead of spawning `sh` processes
    pub fn with_executor(mut self, executor: Arc<dyn HookExecutor>) -> Self {
        self.executor = OnceLock::from(executor);
        self
    }

    /// Replace the evaluator used for `prompt` hooks
    pub fn with_prompt_evaluator(mut self, prompts: PromptEvaluator) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Give prompt hooks access to the host's reasoning providers
    pub fn with_providers(mut self, registry: Arc<dyn ProviderRegistry>) -> Self {
        self.prompts = Arc::new((*self.prompts).clone().with_registry(registry));
        self
    }

    /// Whether dispatch runs hooks at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Working directory for hook processes
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Directory hooks were discovered in
    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    /// Base (non-scoped) hooks for `event`
    pub fn group(&self, event: CanonicalEvent) -> Option<&MatcherGroup> {
        self.groups.get(&event)
    }

    /// Handle one host event
    pub async fn dispatch(&self, host_event: &str, data: &Value) -> Decision {
        if !self.enabled {
            return Decision::proceed();
        }

        let Some(event) = CanonicalEvent::from_host(host_event) else {
            debug!("No hook event for '{}'", host_event);
            return Decision::proceed();
        };

        let mut data = data.clone();
        if host_event == host::SESSION_RESUME {
            if !data.is_object() {
                data = json!({});
            }
            if let Some(fields) = data.as_object_mut() {
                fields.insert("trigger".to_string(), json!(RESUME_TRIGGER));
            }
        }

        let target = match_target(event, &data);

        // In-flight dispatches keep the scoped sets they started with
        let scoped: Vec<Arc<ScopedHandlerSet>> = self.scoped.read().await.clone();
        let mut entries: Vec<&MatcherEntry> = Vec::new();
        if let Some(group) = self.groups.get(&event) {
            entries.extend(group.matching_entries(&target));
        }
        for set in &scoped {
            if let Some(group) = set.group(event) {
                entries.extend(group.matching_entries(&target));
            }
        }

        if entries.is_empty() {
            return Decision::proceed();
        }

        debug!(
            "Running {} matcher(s) for {} (target '{}')",
            entries.len(),
            event,
            target
        );

        let invocation = Invocation {
            executor: self.executor(&data),
            prompts: Arc::clone(&self.prompts),
            wire: Arc::new(translator::to_wire_format(event, &data)),
            data: Arc::new(data),
        };

        for entry in entries {
            let decision = if entry.parallel {
                run_parallel(&invocation, entry).await
            } else {
                run_sequential(&invocation, entry).await
            };
            if let Some(decision) = decision {
                info!(
                    "Hook matcher '{}' returned {:?} for {}",
                    entry.matcher.pattern(),
                    decision.action,
                    event
                );
                return decision;
            }
        }

        Decision::proceed()
    }

    /// `skill:loaded` handler: reads `skill_name`, `hooks` and `skill_directory`
    pub async fn on_owner_loaded(&self, data: &Value) -> Decision {
        let owner = data.get("skill_name").and_then(Value::as_str).unwrap_or("");
        let hooks = data.get("hooks").filter(|hooks| match hooks {
            Value::Object(events) => !events.is_empty(),
            _ => false,
        });
        let Some(hooks) = hooks.filter(|_| !owner.is_empty()) else {
            return Decision::proceed();
        };

        let settings = match HookSettings::from_event_map(hooks) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring invalid hooks for skill '{}': {}", owner, e);
                return Decision::proceed();
            }
        };
        let directory = data
            .get("skill_directory")
            .and_then(Value::as_str)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        self.load_scoped(owner, &settings, directory.as_deref()).await;
        Decision::proceed()
    }

    /// `skill:unloaded` handler
    pub async fn on_owner_unloaded(&self, data: &Value) -> Decision {
        if let Some(owner) = data.get("skill_name").and_then(Value::as_str) {
            self.unload_scoped(owner).await;
        }
        Decision::proceed()
    }

    /// Register hooks owned by `owner`. Loading an owner again replaces its
    /// hooks without changing its position.
    pub async fn load_scoped(
        &self,
        owner: &str,
        settings: &HookSettings,
        directory: Option<&Path>,
    ) {
        let directory = directory.map(|dir| {
            if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                self.project_dir.join(dir)
            }
        });
        let set = Arc::new(ScopedHandlerSet::new(owner, settings, directory.as_deref()));

        let mut scoped = self.scoped.write().await;
        match scoped.iter_mut().find(|existing| existing.owner == owner) {
            Some(existing) => *existing = set,
            None => scoped.push(set),
        }
        info!(
            "Registered {} hook event(s) for skill '{}'",
            settings.event_count(),
            owner
        );
    }

    /// Remove the hooks owned by `owner`; `false` if it had none
    pub async fn unload_scoped(&self, owner: &str) -> bool {
        let mut scoped = self.scoped.write().await;
        let before = scoped.len();
        scoped.retain(|set| set.owner != owner);
        let removed = scoped.len() != before;
        if removed {
            info!("Unregistered hooks for skill '{}'", owner);
        }
        removed
    }

    pub async fn scoped_owners(&self) -> Vec<String> {
        self.scoped
            .read()
            .await
            .iter()
            .map(|set| set.owner.clone())
            .collect()
    }

    /// Release the executor's per-session resources
    pub fn cleanup(&self) {
        if let Some(executor) = self.executor.get() {
            executor.cleanup();
        }
    }

    /// Register a handler for every host event on `registry`
    pub fn mount(self: &Arc<Self>, registry: &dyn HookRegistry) -> Mount {
        let mut unregisters = Vec::new();

        for (event, name) in HOST_BINDINGS {
            let dispatcher = Arc::clone(self);
            let handler: HostHandler = Arc::new(move |event: String, data: Value| -> HandlerFuture {
                let dispatcher = Arc::clone(&dispatcher);
                Box::pin(async move { dispatcher.dispatch(&event, &data).await })
            });
            unregisters.push(registry.register(event, name, HANDLER_PRIORITY, handler));
        }

        let dispatcher = Arc::clone(self);
        let loaded: HostHandler = Arc::new(move |_event: String, data: Value| -> HandlerFuture {
            let dispatcher = Arc::clone(&dispatcher);
            Box::pin(async move { dispatcher.on_owner_loaded(&data).await })
        });
        unregisters.push(registry.register(
            host::SKILL_LOADED,
            "shell-skill-loaded",
            HANDLER_PRIORITY,
            loaded,
        ));

        let dispatcher = Arc::clone(self);
        let unloaded: HostHandler = Arc::new(move |_event: String, data: Value| -> HandlerFuture {
            let dispatcher = Arc::clone(&dispatcher);
            Box::pin(async move { dispatcher.on_owner_unloaded(&data).await })
        });
        unregisters.push(registry.register(
            host::SKILL_UNLOADED,
            "shell-skill-unloaded",
            HANDLER_PRIORITY,
            unloaded,
        ));

        info!("Mounted {} hook handler(s)", unregisters.len());
        Mount { unregisters }
    }

    /// Created on first use with the session id of that event
    fn executor(&self, data: &Value) -> Arc<dyn HookExecutor> {
        let executor = self.executor.get_or_init(|| {
            let session_id = data
                .get("session_id")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_SESSION_ID);
            let executor: Arc<dyn HookExecutor> = Arc::new(ProcessExecutor::new(
                &self.project_dir,
                &self.hooks_dir,
                session_id,
            ));
            executor
        });
        Arc::clone(executor)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Everything a single handler run needs, shareable with spawned tasks
#[derive(Clone)]
struct Invocation {
    executor: Arc<dyn HookExecutor>,
    prompts: Arc<PromptEvaluator>,
    wire: Arc<Value>,
    data: Arc<Value>,
}

impl Invocation {
    async fn run(&self, handler: &Handler) -> Decision {
        match handler {
            Handler::Command { command, timeout } => {
                debug!("Executing hook: {}", command);
                let output = self.executor.execute(command, &self.wire, *timeout).await;
                translator::from_process_result(output.exit_code, &output.stdout, &output.stderr)
            }
            Handler::Prompt { prompt } => self.prompts.evaluate(prompt, &self.data).await.into_decision(),
            Handler::Unsupported(why) => {
                debug!("Skipping hook ({})", why);
                Decision::proceed()
            }
        }
    }
}

async fn run_sequential(invocation: &Invocation, entry: &MatcherEntry) -> Option<Decision> {
    for handler in &entry.handlers {
        let decision = invocation.run(handler).await;
        if decision.is_blocking() {
            return Some(decision);
        }
    }
    None
}

/// Every handler runs to completion; the first blocking result in
/// declaration order wins
async fn run_parallel(invocation: &Invocation, entry: &MatcherEntry) -> Option<Decision> {
    let tasks = entry.handlers.iter().cloned().map(|handler| {
        let invocation = invocation.clone();
        tokio::spawn(async move { invocation.run(&handler).await })
    });

    let mut blocking = None;
    for result in join_all(tasks).await {
        match result {
            Ok(decision) if decision.is_blocking() => {
                blocking.get_or_insert(decision);
            }
            Ok(_) => {}
            Err(e) => warn!("Parallel hook failed: {}", e),
        }
    }
    blocking
}

/// SessionStart matches on the trigger, everything else on the tool name
fn match_target(event: CanonicalEvent, data: &Value) -> String {
    let field = |key: &str| data.get(key).and_then(Value::as_str);
    let target = match event {
        CanonicalEvent::SessionStart => Some(field("trigger").unwrap_or(DEFAULT_TRIGGER)),
        _ => field("tool_name").or_else(|| field("name")),
    };
    target.unwrap_or_default().to_string()
}

fn build_groups(
    settings: &HookSettings,
    prepare: impl Fn(&[MatcherSpec]) -> Vec<MatcherSpec>,
) -> HashMap<CanonicalEvent, MatcherGroup> {
    let mut groups = HashMap::new();
    for (name, specs) in &settings.hooks {
        let Some(event) = CanonicalEvent::from_name(name) else {
            warn!("Ignoring hooks for unknown event '{}'", name);
            continue;
        };
        let group = MatcherGroup::new(&prepare(specs));
        if !group.is_empty() {
            groups.insert(event, group);
        }
    }
    groups
}

fn resolve_relative_commands(specs: &[MatcherSpec], directory: &Path) -> Vec<MatcherSpec> {
    let mut specs = specs.to_vec();
    for hook in specs.iter_mut().flat_map(|spec| spec.hooks.iter_mut()) {
        if hook.kind != "command" {
            continue;
        }
        let Some(command) = hook.command.as_mut() else {
            continue;
        };
        if command.starts_with("./") || command.starts_with("../") {
            let resolved = normalize(&directory.join(&*command)).display().to_string();
            debug!("Resolved hook path: {} -> {}", command, resolved);
            *command = resolved;
        }
    }
    specs
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
