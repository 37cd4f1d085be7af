//! Hook handler trait.
//!
//! Defines the [`HookHandler`] trait that all hook implementations satisfy.
//! Handlers are registered with the [`HookRegistry`](crate::registry::HookRegistry)
//! and executed by the [`HookEngine`](crate::engine::HookEngine).

use async_trait::async_trait;

use crate::errors::HookError;
use crate::types::{HookContext, HookPoint, HookResult};

/// A lifecycle hook handler.
///
/// Implementations are registered in the hook registry and executed at the
/// matching lifecycle point. Handlers can inspect the context and return a
/// [`HookResult`] indicating whether to continue, block, or modify the
/// guarded operation.
///
/// # Priority
///
/// Higher priority handlers run first. Default priority is 0; ties run in
/// registration order.
///
/// # Timeout
///
/// A handler may declare a timeout. Exceeding it counts as `continue` with a
/// logged warning — a slow hook can never silently block the agent. The
/// default is no timeout.
///
/// # Filtering
///
/// Override [`should_handle`](HookHandler::should_handle) to conditionally
/// skip the handler for specific contexts.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Unique name for this handler.
    fn name(&self) -> &str;

    /// Which lifecycle point this handler responds to.
    fn hook_point(&self) -> HookPoint;

    /// Execution priority. Higher runs first. Default: 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Optional human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Optional timeout in milliseconds. Default: none (unbounded).
    fn timeout_ms(&self) -> Option<u64> {
        None
    }

    /// Execute the handler with the given context.
    ///
    /// Errors are caught by the engine and treated as `continue` (fail-open).
    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError>;

    /// Optional filter. Return `false` to skip this handler for the context.
    fn should_handle(&self, _context: &HookContext) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct DefaultHandler;

    #[async_trait]
    impl HookHandler for DefaultHandler {
        fn name(&self) -> &str {
            "default"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::PreToolUse
        }
        async fn handle(&self, _context: &HookContext) -> Result<HookResult, HookError> {
            Ok(HookResult::continue_())
        }
    }

    fn make_context() -> HookContext {
        HookContext::PreToolUse {
            session_id: "sess_1".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            tool_name: "bash".into(),
            tool_arguments: json!({}),
            tool_call_id: "tc_1".into(),
        }
    }

    #[tokio::test]
    async fn defaults() {
        let handler = DefaultHandler;
        assert_eq!(handler.priority(), 0);
        assert!(handler.timeout_ms().is_none());
        assert!(handler.description().is_none());
        assert!(handler.should_handle(&make_context()));
    }

    #[tokio::test]
    async fn handle_returns_result() {
        let handler = DefaultHandler;
        let result = handler.handle(&make_context()).await.unwrap();
        assert!(!result.is_blocked());
    }
}
