//! Host event bus boundary
//!
//! The dispatcher only needs a way to register an async handler for a named
//! host event and to remove it again. [`EventBus`] is a small in-process
//! implementation used by the CLI and the tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use super::decision::Decision;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Decision> + Send>>;

/// Async handler receiving `(host_event, data)`
pub type HostHandler = Arc<dyn Fn(String, Value) -> HandlerFuture + Send + Sync>;

/// Removes a registration when called
pub type Unregister = Box<dyn FnOnce() + Send>;

/// Somewhere the dispatcher can attach its host event handlers
pub trait HookRegistry: Send + Sync {
    /// Register `handler` for `event`. Lower priorities run first.
    fn register(&self, event: &str, name: &str, priority: i32, handler: HostHandler)
    -> Unregister;
}

struct Registration {
    id: u64,
    event: String,
    name: String,
    priority: i32,
    handler: HostHandler,
}

/// In-process [`HookRegistry`] that runs handlers by priority
#[derive(Default)]
pub struct EventBus {
    registrations: Arc<RwLock<Vec<Registration>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the handlers registered for `event`, in execution order
    pub fn handler_names(&self, event: &str) -> Vec<String> {
        self.snapshot(event)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Run every handler for `event`; the first blocking decision wins
    pub async fn emit(&self, event: &str, data: Value) -> Decision {
        for (name, handler) in self.snapshot(event) {
            let decision = handler(event.to_string(), data.clone()).await;
            if decision.is_blocking() {
                info!(
                    "Handler '{}' returned {:?} for '{}'",
                    name, decision.action, event
                );
                return decision;
            }
        }
        Decision::proceed()
    }

    fn snapshot(&self, event: &str) -> Vec<(String, HostHandler)> {
        let registrations = self
            .registrations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut matching: Vec<_> = registrations
            .iter()
            .filter(|r| r.event == event)
            .map(|r| (r.priority, r.id, r.name.clone(), r.handler.clone()))
            .collect();
        matching.sort_by_key(|(priority, id, _, _)| (*priority, *id));
        matching
            .into_iter()
            .map(|(_, _, name, handler)| (name, handler))
            .collect()
    }
}

impl HookRegistry for EventBus {
    fn register(
        &self,
        event: &str,
        name: &str,
        priority: i32,
        handler: HostHandler,
    ) -> Unregister {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registrations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Registration {
                id,
                event: event.to_string(),
                name: name.to_string(),
                priority,
                handler,
            });
        debug!("Registered handler '{}' for '{}'", name, event);

        let registrations = Arc::clone(&self.registrations);
        Box::new(move || {
            registrations
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .retain(|r| r.id != id);
        })
    }
}
