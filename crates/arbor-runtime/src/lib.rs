//! Session-level runtime over the event store.
//!
//! - [`SessionManager`]: create/get/list sessions, message appends, end,
//!   fork (replay-based), rewind (compensating event), model switch
//! - [`PlanManager`]: plan-mode transitions with a `PreToolUse` guard hook
//! - [`TodoManager`]: event-sourced todo lists with backlog restore

pub mod errors;
pub mod plan;
pub mod reconstruct;
pub mod session_manager;
pub mod todos;

pub use errors::{Result, RuntimeError};
pub use plan::{PlanGuardHook, PlanManager, PlanState};
pub use reconstruct::{Message, materialize_messages};
pub use session_manager::{
    ForkResult, NewAssistantMessage, RewindResult, SessionFilter, SessionManager, SessionView,
};
pub use todos::TodoManager;
