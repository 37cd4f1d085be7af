//! Worktree event payloads.

use serde::{Deserialize, Serialize};

/// Fork source recorded on an acquired worktree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeForkSource {
    /// Session the checkout was forked from.
    pub session_id: String,
    /// Commit the fork was based on.
    pub commit: String,
}

/// Payload for `worktree.acquired` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeAcquiredPayload {
    /// Checkout path.
    pub path: String,
    /// Branch name (`"none"` outside a repository).
    pub branch: String,
    /// Base commit hash (`"none"` outside a repository).
    pub base_commit: String,
    /// Whether the checkout is isolated from the main directory.
    pub isolated: bool,
    /// Fork source, when the session was forked from another.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<WorktreeForkSource>,
}

/// Payload for `worktree.released` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeReleasedPayload {
    /// Checkout path.
    pub path: String,
    /// Branch name.
    pub branch: String,
    /// Final commit, when an auto-save commit was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_commit: Option<String>,
    /// Whether the checkout directory was deleted.
    pub worktree_deleted: bool,
    /// Whether the branch was deleted.
    pub branch_deleted: bool,
}

/// Payload for `worktree.commit` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeCommitPayload {
    /// Commit hash.
    pub hash: String,
    /// Commit message.
    pub message: String,
    /// Paths touched by the commit.
    pub files_changed: Vec<String>,
    /// Lines added.
    pub insertions: i64,
    /// Lines removed.
    pub deletions: i64,
}

/// Payload for `worktree.merged` events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeMergedPayload {
    /// Whether the merge completed.
    pub success: bool,
    /// Strategy used (`merge`, `squash`, `rebase`).
    pub strategy: String,
    /// Session branch merged from.
    pub source_branch: String,
    /// Branch merged into.
    pub target_branch: String,
    /// Resulting commit, when the merge succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}
