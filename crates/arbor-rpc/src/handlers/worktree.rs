//! Worktree handlers: acquire, release, list.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Value, json};

use arbor_worktree::{AcquireOptions, MergeStrategy, ReleaseOptions};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{optional_string_param, require_string_param};
use crate::registry::MethodHandler;

/// Acquire a working directory for a session.
pub struct AcquireHandler;

#[async_trait]
impl MethodHandler for AcquireHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let working_directory = require_string_param(params.as_ref(), "workingDirectory")?;
        let coordinator = ctx.require_coordinator()?;

        let opts = AcquireOptions {
            force_isolation: params
                .as_ref()
                .and_then(|p| p.get("forceIsolation"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            parent_session_id: optional_string_param(params.as_ref(), "parentSessionId"),
            parent_commit: optional_string_param(params.as_ref(), "parentCommit"),
            branch_name: optional_string_param(params.as_ref(), "branchName"),
        };

        let dir = coordinator
            .acquire(&session_id, &PathBuf::from(working_directory), &opts)
            .await?;
        Ok(serde_json::to_value(dir).unwrap_or(Value::Null))
    }
}

/// Release a session's working directory.
pub struct ReleaseHandler;

#[async_trait]
impl MethodHandler for ReleaseHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let coordinator = ctx.require_coordinator()?;

        let merge_strategy = match optional_string_param(params.as_ref(), "mergeStrategy") {
            Some(s) => serde_json::from_value(json!(s))
                .map_err(|_| RpcError::invalid_params(format!("unknown merge strategy: {s}")))?,
            None => MergeStrategy::default(),
        };
        let opts = ReleaseOptions {
            commit_message: optional_string_param(params.as_ref(), "commitMessage"),
            merge_to: optional_string_param(params.as_ref(), "mergeTo"),
            merge_strategy,
        };

        let outcome = coordinator.release(&session_id, &opts).await?;
        Ok(json!({
            "path": outcome.directory.path.display().to_string(),
            "branch": outcome.directory.branch,
            "finalCommit": outcome.final_commit,
            "worktreeDeleted": outcome.worktree_deleted,
            "branchDeleted": outcome.branch_deleted,
            "merge": outcome.merge,
        }))
    }
}

/// List acquired working directories.
pub struct ListWorktreesHandler;

#[async_trait]
impl MethodHandler for ListWorktreesHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let coordinator = ctx.require_coordinator()?;
        let dirs: Vec<Value> = coordinator
            .active_sessions()
            .into_iter()
            .filter_map(|session_id| coordinator.get_directory(&session_id))
            .map(|dir| serde_json::to_value(dir).unwrap_or(Value::Null))
            .collect();
        Ok(json!({"worktrees": dirs}))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
