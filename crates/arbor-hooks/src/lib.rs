//! Lifecycle hook engine for the Arbor runtime.
//!
//! Hooks intercept lifecycle points (tool calls, prompts, session
//! transitions) with registered logic that can veto, rewrite, or augment
//! behavior. Handlers run sequentially in priority order; a `block` result
//! halts the chain, `modify` results rewrite the shared context for later
//! handlers and the caller, and handler failures are fail-open.

pub mod engine;
pub mod errors;
pub mod handler;
pub mod registry;
pub mod types;

pub use engine::{HookEngine, HookExecution};
pub use errors::HookError;
pub use handler::HookHandler;
pub use registry::HookRegistry;
pub use types::{HookAction, HookContext, HookInfo, HookPoint, HookResult};
