//! Worktree coordinator types: configuration, handles, options, outcomes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When a session gets an isolated checkout instead of the main directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Every session gets its own worktree.
    Always,
    /// Isolate only when the main directory is already owned by another
    /// active session (or when explicitly requested).
    #[default]
    Lazy,
    /// Never isolate; everyone shares the main directory.
    Never,
}

/// Coordinator configuration.
#[derive(Clone, Debug)]
pub struct WorktreeConfig {
    /// Isolation policy mode.
    pub isolation_mode: IsolationMode,
    /// Directory under the repo root holding checkouts.
    pub base_dir_name: String,
    /// Prefix for session branch names.
    pub branch_prefix: String,
    /// Commit uncommitted changes automatically on release.
    pub auto_commit_on_release: bool,
    /// Remove isolated checkouts on release.
    pub delete_on_release: bool,
    /// Keep session branches when their checkout is removed.
    pub preserve_branches: bool,
    /// Timeout for git subprocesses.
    pub git_timeout: Duration,
}

impl Default for WorktreeConfig {
    fn default() -> Self {
        Self {
            isolation_mode: IsolationMode::Lazy,
            base_dir_name: ".worktrees".into(),
            branch_prefix: "session/".into(),
            auto_commit_on_release: true,
            delete_on_release: true,
            preserve_branches: true,
            git_timeout: Duration::from_secs(30),
        }
    }
}

/// A working directory handle produced by the coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDirectory {
    /// Filesystem path of the checkout.
    pub path: PathBuf,
    /// Branch checked out (`"none"` outside a repository).
    pub branch: String,
    /// Whether the checkout is isolated from the main directory.
    pub isolated: bool,
    /// Owning session.
    pub session_id: String,
    /// Commit the checkout was based on (`"none"` outside a repository).
    pub base_commit: String,
}

/// Options for acquiring a working directory.
#[derive(Clone, Debug, Default)]
pub struct AcquireOptions {
    /// Force an isolated checkout regardless of mode (unless mode is `never`).
    pub force_isolation: bool,
    /// Session this one was forked from; implies isolation and bases the
    /// checkout on the parent's current commit.
    pub parent_session_id: Option<String>,
    /// Explicit base commit, overriding parent/HEAD detection.
    pub parent_commit: Option<String>,
    /// Explicit branch name, overriding `<prefix><session-id>`.
    pub branch_name: Option<String>,
}

/// Merge strategy used when releasing with `merge_to`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Non-fast-forward merge commit.
    #[default]
    Merge,
    /// Squash into a single commit.
    Squash,
    /// Rebase the session branch, then fast-forward.
    Rebase,
}

impl MergeStrategy {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}

/// Options for releasing a working directory.
#[derive(Clone, Debug, Default)]
pub struct ReleaseOptions {
    /// Commit message for the auto-save commit (forces a commit when dirty).
    pub commit_message: Option<String>,
    /// Target branch to merge the session branch into.
    pub merge_to: Option<String>,
    /// Strategy for the merge.
    pub merge_strategy: MergeStrategy,
}

/// Outcome of a merge attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Whether the merge completed.
    pub success: bool,
    /// Strategy used.
    pub strategy: MergeStrategy,
    /// Session branch merged from.
    pub source_branch: String,
    /// Branch merged into.
    pub target_branch: String,
    /// Resulting commit on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    /// Conflicting paths on failure (the error text when git reports none).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
}

/// Outcome of releasing a working directory.
#[derive(Clone, Debug)]
pub struct ReleaseOutcome {
    /// The handle that was released.
    pub directory: WorkingDirectory,
    /// Auto-save commit hash, when one was made.
    pub final_commit: Option<String>,
    /// Whether the checkout directory was deleted.
    pub worktree_deleted: bool,
    /// Whether the branch was deleted.
    pub branch_deleted: bool,
    /// Merge outcome, when a merge was requested.
    pub merge: Option<MergeOutcome>,
}

/// Summary of a crash-recovery sweep.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecoverySummary {
    /// Orphaned checkouts whose dirty state was committed.
    pub recovered: usize,
    /// Orphaned checkouts removed.
    pub deleted: usize,
}
