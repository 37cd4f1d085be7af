//! RPC handler modules and registration.

pub mod canvas;
pub mod events;
pub mod memory;
pub mod model;
pub mod plan;
pub mod session;
pub mod system;
pub mod todos;
pub mod worktree;

use crate::registry::{MethodOptions, MethodRegistry};

/// Register all RPC handlers with the registry.
pub fn register_all(registry: &mut MethodRegistry) {
    // System
    registry.register("system.ping", system::PingHandler, MethodOptions::default());
    registry.register("system.stats", system::StatsHandler, MethodOptions::default());

    // Session
    registry.register(
        "session.create",
        session::CreateSessionHandler,
        MethodOptions::params(&["model", "workingDirectory"]).managers(&["sessionManager"]),
    );
    registry.register(
        "session.get",
        session::GetSessionHandler,
        MethodOptions::params(&["sessionId"]).managers(&["sessionManager"]),
    );
    registry.register(
        "session.list",
        session::ListSessionsHandler,
        MethodOptions::default().managers(&["sessionManager"]),
    );
    registry.register(
        "session.delete",
        session::DeleteSessionHandler,
        MethodOptions::params(&["sessionId"]).managers(&["sessionManager"]),
    );
    registry.register(
        "session.fork",
        session::ForkSessionHandler,
        MethodOptions::params(&["sessionId"]).managers(&["sessionManager"]),
    );
    registry.register(
        "session.rewind",
        session::RewindSessionHandler,
        MethodOptions::params(&["sessionId", "toMessageIndex"]).managers(&["sessionManager"]),
    );
    registry.register(
        "session.resume",
        session::ResumeSessionHandler,
        MethodOptions::params(&["sessionId"]).managers(&["sessionManager"]),
    );
    registry.register(
        "session.end",
        session::EndSessionHandler,
        MethodOptions::params(&["sessionId"]).managers(&["sessionManager"]),
    );

    // Model
    registry.register("model.list", model::ListModelsHandler, MethodOptions::default());
    registry.register(
        "model.switch",
        model::SwitchModelHandler,
        MethodOptions::params(&["sessionId", "model"]).managers(&["sessionManager"]),
    );

    // Memory
    registry.register(
        "memory.search",
        memory::SearchMemoryHandler,
        MethodOptions::params(&["query"]).managers(&["recall"]),
    );
    registry.register(
        "memory.getHandoffs",
        memory::GetHandoffsHandler,
        MethodOptions::default().managers(&["handoffs"]),
    );
    registry.register(
        "memory.getLedger",
        memory::GetLedgerHandler,
        MethodOptions::params(&["workspaceId"]).managers(&["ledger"]),
    );
    registry.register(
        "memory.updateLedger",
        memory::UpdateLedgerHandler,
        MethodOptions::params(&["workspaceId"]).managers(&["ledger"]),
    );

    // Plan
    registry.register(
        "plan.enter",
        plan::EnterPlanHandler,
        MethodOptions::params(&["sessionId", "skillName"]).managers(&["planManager"]),
    );
    registry.register(
        "plan.exit",
        plan::ExitPlanHandler,
        MethodOptions::params(&["sessionId", "reason"]).managers(&["planManager"]),
    );
    registry.register(
        "plan.getState",
        plan::GetPlanStateHandler,
        MethodOptions::params(&["sessionId"]).managers(&["planManager"]),
    );

    // Todos
    registry.register(
        "todos.list",
        todos::ListTodosHandler,
        MethodOptions::params(&["sessionId"]).managers(&["todoManager"]),
    );
    registry.register(
        "todos.update",
        todos::UpdateTodosHandler,
        MethodOptions::params(&["sessionId", "todos"]).managers(&["todoManager"]),
    );
    registry.register(
        "todos.restoreFromBacklog",
        todos::RestoreFromBacklogHandler,
        MethodOptions::params(&["sessionId"]).managers(&["todoManager"]),
    );

    // Worktree
    registry.register(
        "worktree.acquire",
        worktree::AcquireHandler,
        MethodOptions::params(&["sessionId", "workingDirectory"]).managers(&["coordinator"]),
    );
    registry.register(
        "worktree.release",
        worktree::ReleaseHandler,
        MethodOptions::params(&["sessionId"]).managers(&["coordinator"]),
    );
    registry.register(
        "worktree.list",
        worktree::ListWorktreesHandler,
        MethodOptions::default().managers(&["coordinator"]),
    );

    // Canvas
    registry.register(
        "canvas.get",
        canvas::GetCanvasHandler,
        MethodOptions::params(&["canvasId"]).managers(&["canvases"]),
    );
    registry.register(
        "canvas.save",
        canvas::SaveCanvasHandler,
        MethodOptions::params(&["canvasId", "document"]).managers(&["canvases"]),
    );
    registry.register(
        "canvas.list",
        canvas::ListCanvasesHandler,
        MethodOptions::default().managers(&["canvases"]),
    );

    // Events
    registry.register(
        "events.search",
        events::SearchEventsHandler,
        MethodOptions::params(&["query"]),
    );
    registry.register(
        "events.getHistory",
        events::GetHistoryHandler,
        MethodOptions::params(&["sessionId"]),
    );
    registry.register(
        "events.getAncestors",
        events::GetAncestorsHandler,
        MethodOptions::params(&["eventId"]),
    );
}

/// Extract a required parameter from the params object.
pub(crate) fn require_param<'a>(
    params: Option<&'a serde_json::Value>,
    key: &str,
) -> Result<&'a serde_json::Value, crate::errors::RpcError> {
    params
        .and_then(|p| p.get(key))
        .ok_or_else(|| crate::errors::RpcError::invalid_params(format!(
            "Missing required parameter: {key}"
        )))
}

/// Extract a required string parameter.
pub(crate) fn require_string_param(
    params: Option<&serde_json::Value>,
    key: &str,
) -> Result<String, crate::errors::RpcError> {
    require_param(params, key)?
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            crate::errors::RpcError::invalid_params(format!("Parameter '{key}' must be a string"))
        })
}

/// Extract an optional string parameter.
pub(crate) fn optional_string_param(
    params: Option<&serde_json::Value>,
    key: &str,
) -> Option<String> {
    params
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
}

/// Extract an optional integer parameter.
pub(crate) fn optional_i64_param(params: Option<&serde_json::Value>, key: &str) -> Option<i64> {
    params.and_then(|p| p.get(key)).and_then(serde_json::Value::as_i64)
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Arc;
    use std::time::Instant;

    use arbor_events::EventStore;
    use arbor_memory::{CanvasStore, HandoffStore, LedgerStore, Recall};
    use arbor_runtime::{PlanManager, SessionManager, TodoManager};

    use crate::context::RpcContext;

    /// Context with every manager wired to in-memory backends.
    pub fn make_test_context() -> RpcContext {
        let store = Arc::new(EventStore::in_memory().unwrap());
        let handoffs = Arc::new(HandoffStore::in_memory().unwrap());
        let ledger = Arc::new(LedgerStore::new(handoffs.pool().clone()));
        let canvas_dir = std::env::temp_dir().join(format!("arbor-rpc-test-{}", uuid::Uuid::now_v7()));
        let canvases = Arc::new(CanvasStore::new(&canvas_dir).unwrap());

        RpcContext {
            event_store: Arc::clone(&store),
            session_manager: Some(Arc::new(SessionManager::new(Arc::clone(&store)))),
            plan_manager: Some(Arc::new(PlanManager::new(Arc::clone(&store)))),
            todo_manager: Some(Arc::new(TodoManager::new(Arc::clone(&store)))),
            recall: Some(Arc::new(Recall::new(Arc::clone(&store)))),
            handoffs: Some(handoffs),
            ledger: Some(ledger),
            canvases: Some(canvases),
            coordinator: None,
            models: vec!["model-a".into(), "model-b".into()],
            server_start: Instant::now(),
        }
    }

    /// Context with only the event store (for NOT_SUPPORTED paths).
    pub fn bare_test_context() -> RpcContext {
        let store = Arc::new(EventStore::in_memory().unwrap());
        RpcContext {
            event_store: store,
            session_manager: None,
            plan_manager: None,
            todo_manager: None,
            recall: None,
            handoffs: None,
            ledger: None,
            canvases: None,
            coordinator: None,
            models: Vec::new(),
            server_start: Instant::now(),
        }
    }

    /// Create a session through the context's session manager.
    pub fn make_session(ctx: &RpcContext) -> String {
        ctx.session_manager
            .as_ref()
            .unwrap()
            .create("model-a", "anthropic", "/tmp/project")
            .unwrap()
            .id
    }
}
