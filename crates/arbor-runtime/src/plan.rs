//! Plan mode manager.
//!
//! Plan mode is a per-session phase where a planning skill drives the
//! conversation and a set of tools is blocked. Transitions are recorded as
//! `plan.mode_entered` / `plan.mode_exited` events; the live state lives in
//! the manager.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use arbor_events::{AppendOptions, EventStore, EventType};
use arbor_hooks::{HookContext, HookError, HookHandler, HookPoint, HookResult};

use crate::errors::{Result, RuntimeError};

/// Live plan-mode state for one session.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
    /// Skill driving the planning phase.
    pub skill_name: String,
    /// Tools blocked while planning.
    pub blocked_tools: Vec<String>,
    /// When plan mode was entered.
    pub entered_at: String,
}

/// Plan mode manager.
pub struct PlanManager {
    store: Arc<EventStore>,
    states: DashMap<String, PlanState>,
}

impl PlanManager {
    /// Create a new manager.
    #[must_use]
    pub fn new(store: Arc<EventStore>) -> Self {
        Self {
            store,
            states: DashMap::new(),
        }
    }

    /// Enter plan mode for a session.
    pub fn enter(
        &self,
        session_id: &str,
        skill_name: &str,
        blocked_tools: Vec<String>,
    ) -> Result<PlanState> {
        if self.states.contains_key(session_id) {
            return Err(RuntimeError::AlreadyInPlanMode(session_id.to_string()));
        }

        let _ = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::PlanModeEntered,
            payload: json!({"skillName": skill_name, "blockedTools": blocked_tools}),
            parent_id: None,
        })?;

        let state = PlanState {
            skill_name: skill_name.to_string(),
            blocked_tools,
            entered_at: arbor_core::now_iso(),
        };
        let _ = self.states.insert(session_id.to_string(), state.clone());
        debug!(session_id, skill_name, "entered plan mode");
        Ok(state)
    }

    /// Exit plan mode for a session.
    pub fn exit(&self, session_id: &str, reason: &str, plan_path: Option<&str>) -> Result<()> {
        let Some((_, _state)) = self.states.remove(session_id) else {
            return Err(RuntimeError::NotInPlanMode(session_id.to_string()));
        };

        let mut payload = json!({"reason": reason});
        if let Some(path) = plan_path {
            payload["planPath"] = json!(path);
        }
        let _ = self.store.append(&AppendOptions {
            session_id,
            event_type: EventType::PlanModeExited,
            payload,
            parent_id: None,
        })?;
        debug!(session_id, reason, "exited plan mode");
        Ok(())
    }

    /// Current plan state, if the session is in plan mode.
    #[must_use]
    pub fn get_state(&self, session_id: &str) -> Option<PlanState> {
        self.states.get(session_id).map(|s| s.clone())
    }

    /// Whether a tool is blocked for the session right now.
    #[must_use]
    pub fn is_tool_blocked(&self, session_id: &str, tool_name: &str) -> bool {
        self.states
            .get(session_id)
            .is_some_and(|s| s.blocked_tools.iter().any(|t| t == tool_name))
    }
}

/// `PreToolUse` hook vetoing tools blocked by plan mode.
pub struct PlanGuardHook {
    plan: Arc<PlanManager>,
}

impl PlanGuardHook {
    /// Create the guard over a plan manager.
    #[must_use]
    pub fn new(plan: Arc<PlanManager>) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl HookHandler for PlanGuardHook {
    fn name(&self) -> &str {
        "plan-mode-guard"
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::PreToolUse
    }

    // Runs ahead of user-registered hooks.
    fn priority(&self) -> i32 {
        100
    }

    fn description(&self) -> Option<&str> {
        Some("Blocks tools excluded while a session is in plan mode")
    }

    async fn handle(&self, context: &HookContext) -> std::result::Result<HookResult, HookError> {
        let HookContext::PreToolUse { session_id, tool_name, .. } = context else {
            return Ok(HookResult::continue_());
        };
        if self.plan.is_tool_blocked(session_id, tool_name) {
            return Ok(HookResult::block(format!(
                "tool '{tool_name}' is blocked while in plan mode"
            )));
        }
        Ok(HookResult::continue_())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn setup() -> (Arc<EventStore>, PlanManager, String) {
        let store = Arc::new(EventStore::in_memory().unwrap());
        let session = store
            .create_session(&arbor_events::NewSessionOptions {
                model: "model-a",
                provider: "anthropic",
                workspace_path: "/tmp/project",
                working_directory: None,
                parent_session_id: None,
            })
            .unwrap()
            .session
            .id;
        let plan = PlanManager::new(Arc::clone(&store));
        (store, plan, session)
    }

    #[test]
    fn enter_records_event_and_state() {
        let (store, plan, session) = setup();
        let state = plan
            .enter(&session, "design", vec!["bash".into(), "write".into()])
            .unwrap();
        assert_eq!(state.skill_name, "design");

        let events = store
            .get_events_by_type(&session, &[EventType::PlanModeEntered], None)
            .unwrap();
        assert_eq!(events.len(), 1);
        let payload = events[0].payload_value().unwrap();
        assert_eq!(payload["skillName"], "design");
        assert_eq!(payload["blockedTools"][0], "bash");
    }

    #[test]
    fn double_enter_is_rejected() {
        let (_store, plan, session) = setup();
        let _ = plan.enter(&session, "design", vec![]).unwrap();
        let err = plan.enter(&session, "design", vec![]).unwrap_err();
        assert_matches!(err, RuntimeError::AlreadyInPlanMode(_));
        assert_eq!(err.code(), "ALREADY_IN_PLAN_MODE");
    }

    #[test]
    fn exit_requires_plan_mode() {
        let (_store, plan, session) = setup();
        let err = plan.exit(&session, "done", None).unwrap_err();
        assert_matches!(err, RuntimeError::NotInPlanMode(_));
        assert_eq!(err.code(), "NOT_IN_PLAN_MODE");
    }

    #[test]
    fn exit_records_event_with_plan_path() {
        let (store, plan, session) = setup();
        let _ = plan.enter(&session, "design", vec![]).unwrap();
        plan.exit(&session, "approved", Some("plans/refactor.md")).unwrap();

        assert!(plan.get_state(&session).is_none());
        let events = store
            .get_events_by_type(&session, &[EventType::PlanModeExited], None)
            .unwrap();
        let payload = events[0].payload_value().unwrap();
        assert_eq!(payload["reason"], "approved");
        assert_eq!(payload["planPath"], "plans/refactor.md");
    }

    #[test]
    fn blocked_tool_lookup() {
        let (_store, plan, session) = setup();
        let _ = plan.enter(&session, "design", vec!["bash".into()]).unwrap();
        assert!(plan.is_tool_blocked(&session, "bash"));
        assert!(!plan.is_tool_blocked(&session, "read"));
        assert!(!plan.is_tool_blocked("sess_other", "bash"));
    }

    #[tokio::test]
    async fn guard_hook_blocks_listed_tools() {
        let (_store, plan, session) = setup();
        let plan = Arc::new(plan);
        let _ = plan.enter(&session, "design", vec!["bash".into()]).unwrap();

        let hook = PlanGuardHook::new(Arc::clone(&plan));
        let blocked = hook
            .handle(&HookContext::PreToolUse {
                session_id: session.clone(),
                timestamp: arbor_core::now_iso(),
                tool_name: "bash".into(),
                tool_arguments: json!({}),
                tool_call_id: "tc_1".into(),
            })
            .await
            .unwrap();
        assert!(blocked.is_blocked());

        let allowed = hook
            .handle(&HookContext::PreToolUse {
                session_id: session,
                timestamp: arbor_core::now_iso(),
                tool_name: "read".into(),
                tool_arguments: json!({}),
                tool_call_id: "tc_2".into(),
            })
            .await
            .unwrap();
        assert!(!allowed.is_blocked());
    }
}
