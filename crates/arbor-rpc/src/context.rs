//! Handler context — the manager handles available to RPC handlers.
//!
//! Every manager is optional: a server can be assembled with only the pieces
//! it needs, and handlers declaring a missing manager fail with
//! `NOT_SUPPORTED` before they run.

use std::sync::Arc;
use std::time::Instant;

use arbor_events::EventStore;
use arbor_memory::{CanvasStore, HandoffStore, LedgerStore, Recall};
use arbor_runtime::{PlanManager, SessionManager, TodoManager};
use arbor_worktree::WorktreeCoordinator;

use crate::errors::RpcError;

/// Manager handles passed to every RPC handler.
pub struct RpcContext {
    /// The event store (always present).
    pub event_store: Arc<EventStore>,
    /// Session manager.
    pub session_manager: Option<Arc<SessionManager>>,
    /// Plan mode manager.
    pub plan_manager: Option<Arc<PlanManager>>,
    /// Todo manager.
    pub todo_manager: Option<Arc<TodoManager>>,
    /// Recall interface.
    pub recall: Option<Arc<Recall>>,
    /// Handoff store.
    pub handoffs: Option<Arc<HandoffStore>>,
    /// Ledger store.
    pub ledger: Option<Arc<LedgerStore>>,
    /// Canvas artifact store.
    pub canvases: Option<Arc<CanvasStore>>,
    /// Worktree coordinator.
    pub coordinator: Option<Arc<WorktreeCoordinator>>,
    /// Models offered by `model.list`.
    pub models: Vec<String>,
    /// Server start time (for uptime reporting).
    pub server_start: Instant,
}

impl RpcContext {
    /// Whether a manager is present, by registry name.
    #[must_use]
    pub fn has_manager(&self, name: &str) -> bool {
        match name {
            "sessionManager" => self.session_manager.is_some(),
            "planManager" => self.plan_manager.is_some(),
            "todoManager" => self.todo_manager.is_some(),
            "recall" => self.recall.is_some(),
            "handoffs" => self.handoffs.is_some(),
            "ledger" => self.ledger.is_some(),
            "canvases" => self.canvases.is_some(),
            "coordinator" => self.coordinator.is_some(),
            "eventStore" => true,
            _ => false,
        }
    }

    /// The session manager, or `NOT_SUPPORTED`.
    pub fn require_session_manager(&self) -> Result<&Arc<SessionManager>, RpcError> {
        self.session_manager
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("sessionManager"))
    }

    /// The plan manager, or `NOT_SUPPORTED`.
    pub fn require_plan_manager(&self) -> Result<&Arc<PlanManager>, RpcError> {
        self.plan_manager
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("planManager"))
    }

    /// The todo manager, or `NOT_SUPPORTED`.
    pub fn require_todo_manager(&self) -> Result<&Arc<TodoManager>, RpcError> {
        self.todo_manager
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("todoManager"))
    }

    /// The recall interface, or `NOT_SUPPORTED`.
    pub fn require_recall(&self) -> Result<&Arc<Recall>, RpcError> {
        self.recall
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("recall"))
    }

    /// The handoff store, or `NOT_SUPPORTED`.
    pub fn require_handoffs(&self) -> Result<&Arc<HandoffStore>, RpcError> {
        self.handoffs
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("handoffs"))
    }

    /// The ledger store, or `NOT_SUPPORTED`.
    pub fn require_ledger(&self) -> Result<&Arc<LedgerStore>, RpcError> {
        self.ledger
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("ledger"))
    }

    /// The canvas store, or `NOT_SUPPORTED`.
    pub fn require_canvases(&self) -> Result<&Arc<CanvasStore>, RpcError> {
        self.canvases
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("canvases"))
    }

    /// The worktree coordinator, or `NOT_SUPPORTED`.
    pub fn require_coordinator(&self) -> Result<&Arc<WorktreeCoordinator>, RpcError> {
        self.coordinator
            .as_ref()
            .ok_or_else(|| RpcError::manager_missing("coordinator"))
    }
}
