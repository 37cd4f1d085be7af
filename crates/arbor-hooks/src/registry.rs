//! Hook registry.
//!
//! Maintains a priority-sorted collection of [`HookHandler`] instances per
//! [`HookPoint`]. The registry is the source of truth for which hooks are
//! active and the order they run in: priority descending, registration order
//! breaking ties (the sort is stable).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::handler::HookHandler;
use crate::types::{HookInfo, HookPoint};

/// Registry of lifecycle hook handlers.
#[derive(Default)]
pub struct HookRegistry {
    /// Handlers keyed by hook point, sorted by priority descending.
    hooks: HashMap<HookPoint, Vec<Arc<dyn HookHandler>>>,
}

impl HookRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Register a hook handler.
    ///
    /// The handler is inserted into its point's bucket and the bucket is
    /// re-sorted by priority (descending, stable). If a handler with the same
    /// name already exists for the same point, it is replaced.
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) {
        let hook_point = handler.hook_point();
        let name = handler.name().to_string();

        let handlers = self.hooks.entry(hook_point).or_default();
        handlers.retain(|h| h.name() != name);

        debug!(name = %name, hook_point = %hook_point, priority = handler.priority(), "registering hook");
        handlers.push(handler);
        handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Unregister a handler by name across all points.
    ///
    /// Returns `true` if a handler was found and removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let mut found = false;
        for handlers in self.hooks.values_mut() {
            let before = handlers.len();
            handlers.retain(|h| h.name() != name);
            found |= handlers.len() < before;
        }
        if found {
            debug!(name = %name, "unregistered hook");
        }
        found
    }

    /// Get handlers for a hook point, sorted by priority (descending).
    #[must_use]
    pub fn get_handlers(&self, hook_point: HookPoint) -> Vec<Arc<dyn HookHandler>> {
        self.hooks.get(&hook_point).cloned().unwrap_or_default()
    }

    /// List information about all registered hooks, sorted by name.
    #[must_use]
    pub fn list_all(&self) -> Vec<HookInfo> {
        let mut infos: Vec<HookInfo> = self
            .hooks
            .values()
            .flatten()
            .map(|handler| HookInfo {
                name: handler.name().to_string(),
                hook_point: handler.hook_point(),
                priority: handler.priority(),
                description: handler.description().map(ToString::to_string),
                timeout_ms: handler.timeout_ms(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Get the total number of registered handlers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Clear all registered handlers.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hook_count", &self.count())
            .finish()
    }
}
