//! Hook execution engine.
//!
//! Runs all registered hooks for a lifecycle point, sequentially, in priority
//! order. Handlers share a mutable context: a `modify` result is applied to
//! the context before later handlers see it, and the merged modifications are
//! propagated back to the caller.
//!
//! # Execution Model
//!
//! - `block` stops the chain immediately; the caller must not proceed with
//!   the guarded operation.
//! - `modify` updates the shared context and continues.
//! - `continue` continues to the next handler.
//!
//! # Fail-Open
//!
//! Handler errors and timeouts never stop the agent. They are logged and
//! count as `continue`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::handler::HookHandler;
use crate::registry::HookRegistry;
use crate::types::{HookAction, HookContext, HookResult};

/// Outcome of running a hook chain.
#[derive(Debug, Clone)]
pub struct HookExecution {
    /// Aggregated result: `block` from the halting handler, `modify` when any
    /// handler modified, otherwise `continue`.
    pub result: HookResult,
    /// The context after all modifications were applied.
    pub context: HookContext,
}

impl HookExecution {
    /// Whether the chain blocked the guarded operation.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.result.is_blocked()
    }
}

/// Hook execution engine owning a [`HookRegistry`].
#[derive(Default)]
pub struct HookEngine {
    registry: HookRegistry,
}

impl HookEngine {
    /// Create a new engine with the given registry.
    #[must_use]
    pub fn new(registry: HookRegistry) -> Self {
        Self { registry }
    }

    /// Execute all registered hooks for the given context.
    #[instrument(skip_all, fields(hook_point = %context.hook_point()))]
    pub async fn execute(&self, context: HookContext) -> HookExecution {
        let hook_point = context.hook_point();
        let handlers = self.registry.get_handlers(hook_point);

        let mut context = context;
        if handlers.is_empty() {
            return HookExecution {
                result: HookResult::continue_(),
                context,
            };
        }

        let start = Instant::now();
        let mut merged_modifications: Option<serde_json::Value> = None;
        let mut messages: Vec<String> = Vec::new();

        for handler in &handlers {
            if !handler.should_handle(&context) {
                debug!(name = %handler.name(), "hook skipped by filter");
                continue;
            }

            let result = Self::run_handler(handler.as_ref(), &context).await;

            match result.action {
                HookAction::Block => {
                    debug!(
                        name = %handler.name(),
                        reason = result.reason.as_deref().unwrap_or("(none)"),
                        "hook blocked execution"
                    );
                    return HookExecution { result, context };
                }
                HookAction::Modify => {
                    if let Some(mods) = &result.modifications {
                        if let Err(e) = context.apply_modifications(mods) {
                            warn!(name = %handler.name(), error = %e, "hook modifications rejected");
                        } else {
                            merged_modifications =
                                Some(merge_json(merged_modifications.as_ref(), mods));
                        }
                    }
                    if let Some(msg) = &result.message {
                        messages.push(msg.clone());
                    }
                }
                HookAction::Continue => {
                    if let Some(msg) = &result.message {
                        messages.push(msg.clone());
                    }
                }
            }
        }

        debug!(
            hook_point = %hook_point,
            duration_ms = start.elapsed().as_millis() as u64,
            modified = merged_modifications.is_some(),
            "hook chain complete"
        );

        let result = HookResult {
            action: if merged_modifications.is_some() {
                HookAction::Modify
            } else {
                HookAction::Continue
            },
            reason: None,
            message: if messages.is_empty() {
                None
            } else {
                Some(messages.join("\n"))
            },
            modifications: merged_modifications,
        };
        HookExecution { result, context }
    }

    /// Execute a single handler, applying its timeout and fail-open policy.
    async fn run_handler(handler: &dyn HookHandler, context: &HookContext) -> HookResult {
        let outcome = match handler.timeout_ms() {
            Some(timeout_ms) => {
                match tokio::time::timeout(
                    std::time::Duration::from_millis(timeout_ms),
                    handler.handle(context),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            name = %handler.name(),
                            timeout_ms,
                            "hook handler timed out (fail-open)"
                        );
                        return HookResult::continue_();
                    }
                }
            }
            None => handler.handle(context).await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(name = %handler.name(), error = %e, "hook handler error (fail-open)");
                HookResult::continue_()
            }
        }
    }

    /// Register a handler.
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) {
        self.registry.register(handler);
    }

    /// Get a reference to the hook registry.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Get a mutable reference to the hook registry.
    pub fn registry_mut(&mut self) -> &mut HookRegistry {
        &mut self.registry
    }
}

impl std::fmt::Debug for HookEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookEngine")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Shallow-merge two JSON objects. `b` fields override `a` fields.
fn merge_json(a: Option<&serde_json::Value>, b: &serde_json::Value) -> serde_json::Value {
    match (a, b) {
        (Some(serde_json::Value::Object(base)), serde_json::Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                let _ = merged.insert(key.clone(), value.clone());
            }
            serde_json::Value::Object(merged)
        }
        _ => b.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HookError;
    use crate::types::HookPoint;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::time::Duration;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct RecordingHandler {
        name: String,
        hook_point: HookPoint,
        priority: i32,
        result: HookResult,
        log: CallLog,
        filtered: bool,
    }

    #[async_trait]
    impl HookHandler for RecordingHandler {
        fn name(&self) -> &str {
            &self.name
        }
        fn hook_point(&self) -> HookPoint {
            self.hook_point
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn handle(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            self.log.lock().unwrap().push(self.name.clone());
            Ok(self.result.clone())
        }
        fn should_handle(&self, _ctx: &HookContext) -> bool {
            !self.filtered
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl HookHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::PreToolUse
        }
        fn priority(&self) -> i32 {
            100
        }
        async fn handle(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            Err(HookError::HandlerError {
                name: "failing".into(),
                message: "intentional".into(),
            })
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl HookHandler for SlowHandler {
        fn name(&self) -> &str {
            "slow"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::PreToolUse
        }
        fn timeout_ms(&self) -> Option<u64> {
            Some(20)
        }
        async fn handle(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(HookResult::block("should never be reached"))
        }
    }

    struct PromptRewriter {
        suffix: String,
    }

    #[async_trait]
    impl HookHandler for PromptRewriter {
        fn name(&self) -> &str {
            "rewriter"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::UserPromptSubmit
        }
        fn priority(&self) -> i32 {
            10
        }
        async fn handle(&self, ctx: &HookContext) -> Result<HookResult, HookError> {
            let HookContext::UserPromptSubmit { prompt, .. } = ctx else {
                return Ok(HookResult::continue_());
            };
            Ok(HookResult::modify(json!({
                "prompt": format!("{prompt}{}", self.suffix)
            })))
        }
    }

    struct PromptAsserter {
        expected: String,
    }

    #[async_trait]
    impl HookHandler for PromptAsserter {
        fn name(&self) -> &str {
            "asserter"
        }
        fn hook_point(&self) -> HookPoint {
            HookPoint::UserPromptSubmit
        }
        fn priority(&self) -> i32 {
            1
        }
        async fn handle(&self, ctx: &HookContext) -> Result<HookResult, HookError> {
            let HookContext::UserPromptSubmit { prompt, .. } = ctx else {
                return Ok(HookResult::block("wrong context"));
            };
            if *prompt == self.expected {
                Ok(HookResult::continue_())
            } else {
                Ok(HookResult::block(format!("saw '{prompt}'")))
            }
        }
    }

    fn tool_context() -> HookContext {
        HookContext::PreToolUse {
            session_id: "sess_1".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            tool_name: "bash".into(),
            tool_arguments: json!({"command": "ls"}),
            tool_call_id: "tc_1".into(),
        }
    }

    fn prompt_context(prompt: &str) -> HookContext {
        HookContext::UserPromptSubmit {
            session_id: "sess_1".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            prompt: prompt.into(),
        }
    }

    fn recording(
        name: &str,
        priority: i32,
        result: HookResult,
        log: &CallLog,
    ) -> Arc<dyn HookHandler> {
        Arc::new(RecordingHandler {
            name: name.into(),
            hook_point: HookPoint::PreToolUse,
            priority,
            result,
            log: Arc::clone(log),
            filtered: false,
        })
    }

    #[tokio::test]
    async fn empty_chain_continues() {
        let engine = HookEngine::new(HookRegistry::new());
        let exec = engine.execute(tool_context()).await;
        assert!(!exec.is_blocked());
        assert_eq!(exec.result.action, HookAction::Continue);
    }

    #[tokio::test]
    async fn priority_order_10_5_1() {
        let log: CallLog = Arc::default();
        let mut registry = HookRegistry::new();
        registry.register(recording("p10", 10, HookResult::continue_(), &log));
        registry.register(recording("p5", 5, HookResult::continue_(), &log));
        registry.register(recording("p1", 1, HookResult::continue_(), &log));

        let engine = HookEngine::new(registry);
        let _ = engine.execute(tool_context()).await;

        assert_eq!(*log.lock().unwrap(), vec!["p10", "p5", "p1"]);
    }

    #[tokio::test]
    async fn block_halts_chain() {
        let log: CallLog = Arc::default();
        let mut registry = HookRegistry::new();
        registry.register(recording("p10", 10, HookResult::block("nope"), &log));
        registry.register(recording("p5", 5, HookResult::continue_(), &log));
        registry.register(recording("p1", 1, HookResult::continue_(), &log));

        let engine = HookEngine::new(registry);
        let exec = engine.execute(tool_context()).await;

        assert!(exec.is_blocked());
        assert_eq!(exec.result.reason.as_deref(), Some("nope"));
        assert_eq!(*log.lock().unwrap(), vec!["p10"]);
    }

    #[tokio::test]
    async fn filtered_handler_is_skipped() {
        let log: CallLog = Arc::default();
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(RecordingHandler {
            name: "skipped".into(),
            hook_point: HookPoint::PreToolUse,
            priority: 10,
            result: HookResult::block("would block"),
            log: Arc::clone(&log),
            filtered: true,
        }));
        registry.register(recording("runs", 1, HookResult::continue_(), &log));

        let engine = HookEngine::new(registry);
        let exec = engine.execute(tool_context()).await;

        assert!(!exec.is_blocked());
        assert_eq!(*log.lock().unwrap(), vec!["runs"]);
    }

    #[tokio::test]
    async fn handler_error_is_continue() {
        let log: CallLog = Arc::default();
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(FailingHandler));
        registry.register(recording("after", 1, HookResult::continue_(), &log));

        let engine = HookEngine::new(registry);
        let exec = engine.execute(tool_context()).await;

        assert!(!exec.is_blocked());
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_continue() {
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(SlowHandler));

        let engine = HookEngine::new(registry);
        let exec = engine.execute(tool_context()).await;

        assert!(!exec.is_blocked());
    }

    #[tokio::test]
    async fn modifications_visible_to_later_handlers() {
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(PromptRewriter { suffix: " [expanded]".into() }));
        registry.register(Arc::new(PromptAsserter { expected: "hello [expanded]".into() }));

        let engine = HookEngine::new(registry);
        let exec = engine.execute(prompt_context("hello")).await;

        assert!(!exec.is_blocked(), "later handler saw unmodified context");
        match exec.context {
            HookContext::UserPromptSubmit { prompt, .. } => {
                assert_eq!(prompt, "hello [expanded]");
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(exec.result.action, HookAction::Modify);
        assert_eq!(
            exec.result.modifications.unwrap()["prompt"],
            "hello [expanded]"
        );
    }

    #[tokio::test]
    async fn messages_are_collected() {
        let log: CallLog = Arc::default();
        let mut registry = HookRegistry::new();
        registry.register(recording(
            "a",
            2,
            HookResult::continue_with_message("first note"),
            &log,
        ));
        registry.register(recording(
            "b",
            1,
            HookResult::continue_with_message("second note"),
            &log,
        ));

        let engine = HookEngine::new(registry);
        let exec = engine.execute(tool_context()).await;
        assert_eq!(exec.result.message.as_deref(), Some("first note\nsecond note"));
    }
}
