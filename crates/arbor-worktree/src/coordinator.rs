//! The worktree coordinator.
//!
//! Decides whether a session runs in the repository's main checkout or in an
//! isolated sibling checkout under `<repo>/.worktrees`; creates, commits,
//! merges, and removes those checkouts; emits an event for every transition;
//! and recovers orphaned checkouts after a crash.
//!
//! Ownership state (which session holds the main directory, which sessions
//! have acquired directories) lives in this struct — there are no
//! free-standing statics. Event appends are observability: a failed append is
//! logged and never aborts the underlying git mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info, warn};

use arbor_events::{AppendOptions, EventStore, EventType};

use crate::errors::{Result, WorktreeError};
use crate::git::GitCli;
use crate::policy::{IsolationInputs, should_isolate};
use crate::types::{
    AcquireOptions, MergeOutcome, MergeStrategy, RecoverySummary, ReleaseOptions, ReleaseOutcome,
    WorkingDirectory, WorktreeConfig,
};

struct ActiveWorktree {
    dir: WorkingDirectory,
    repo_root: Option<PathBuf>,
}

/// Coordinates working-directory lifecycles across concurrent sessions.
pub struct WorktreeCoordinator {
    config: WorktreeConfig,
    git: GitCli,
    store: Arc<EventStore>,
    active: Mutex<HashMap<String, ActiveWorktree>>,
    main_owners: Mutex<HashMap<PathBuf, String>>,
}

impl WorktreeCoordinator {
    /// Create a coordinator over the given store and configuration.
    #[must_use]
    pub fn new(store: Arc<EventStore>, config: WorktreeConfig) -> Self {
        let git = GitCli::new(config.git_timeout, tokio_util::sync::CancellationToken::new());
        Self {
            config,
            git,
            store,
            active: Mutex::new(HashMap::new()),
            main_owners: Mutex::new(HashMap::new()),
        }
    }

    /// The acquired directory for a session, if any.
    #[must_use]
    pub fn get_directory(&self, session_id: &str) -> Option<WorkingDirectory> {
        self.active.lock().get(session_id).map(|a| a.dir.clone())
    }

    /// Session ids with acquired directories.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<String> {
        self.active.lock().keys().cloned().collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Acquire
    // ─────────────────────────────────────────────────────────────────────

    /// Acquire a working directory for a session.
    ///
    /// Idempotent: a session that already holds a directory gets the same
    /// handle back. Outside a repository the handle is non-isolated with
    /// branch and base commit `"none"`.
    pub async fn acquire(
        &self,
        session_id: &str,
        working_dir: &Path,
        opts: &AcquireOptions,
    ) -> Result<WorkingDirectory> {
        if let Some(existing) = self.get_directory(session_id) {
            return Ok(existing);
        }

        let Some(repo_root) = self.git.repo_root(working_dir).await? else {
            let dir = WorkingDirectory {
                path: working_dir.to_path_buf(),
                branch: "none".into(),
                isolated: false,
                session_id: session_id.to_string(),
                base_commit: "none".into(),
            };
            self.register(session_id, dir.clone(), None);
            self.emit_acquired(&dir, opts).await;
            return Ok(dir);
        };

        let main_owned = {
            let owners = self.main_owners.lock();
            owners.get(&repo_root).is_some_and(|owner| owner != session_id)
        };
        let isolate = should_isolate(
            self.config.isolation_mode,
            IsolationInputs {
                force_isolation: opts.force_isolation,
                has_parent_session: opts.parent_session_id.is_some(),
                main_directory_owned: main_owned,
            },
        );

        let dir = if isolate {
            self.acquire_isolated(session_id, &repo_root, opts).await?
        } else {
            self.acquire_main(session_id, working_dir, &repo_root).await?
        };

        self.register(session_id, dir.clone(), Some(repo_root));
        self.emit_acquired(&dir, opts).await;
        Ok(dir)
    }

    async fn acquire_main(
        &self,
        session_id: &str,
        working_dir: &Path,
        repo_root: &Path,
    ) -> Result<WorkingDirectory> {
        let branch = self
            .git
            .current_branch(repo_root)
            .await?
            .unwrap_or_else(|| "none".into());
        let base_commit = self.git.head_commit(repo_root).await?;

        let _ = self
            .main_owners
            .lock()
            .insert(repo_root.to_path_buf(), session_id.to_string());

        debug!(session_id, path = %working_dir.display(), "acquired main directory");
        Ok(WorkingDirectory {
            path: working_dir.to_path_buf(),
            branch,
            isolated: false,
            session_id: session_id.to_string(),
            base_commit,
        })
    }

    async fn acquire_isolated(
        &self,
        session_id: &str,
        repo_root: &Path,
        opts: &AcquireOptions,
    ) -> Result<WorkingDirectory> {
        let base_dir = repo_root.join(&self.config.base_dir_name);
        std::fs::create_dir_all(&base_dir).map_err(|e| WorktreeError::Filesystem {
            path: base_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let base_commit = self.resolve_base_commit(repo_root, opts).await?;
        let branch = opts
            .branch_name
            .clone()
            .unwrap_or_else(|| format!("{}{session_id}", self.config.branch_prefix));
        let checkout = base_dir.join(session_id);

        if !self.git.branch_exists(repo_root, &branch).await? {
            self.git.create_branch_at(repo_root, &branch, &base_commit).await?;
        }
        if !checkout.exists() {
            self.git.worktree_add(repo_root, &checkout, &branch).await?;
        }

        debug!(session_id, branch, path = %checkout.display(), "acquired isolated worktree");
        Ok(WorkingDirectory {
            path: checkout,
            branch,
            isolated: true,
            session_id: session_id.to_string(),
            base_commit,
        })
    }

    /// Base commit precedence: explicit parent commit, then the parent
    /// session's checkout HEAD when it is still active, then repo HEAD.
    async fn resolve_base_commit(&self, repo_root: &Path, opts: &AcquireOptions) -> Result<String> {
        if let Some(commit) = &opts.parent_commit {
            return Ok(commit.clone());
        }
        if let Some(parent) = &opts.parent_session_id {
            let parent_path = self.get_directory(parent).map(|d| d.path);
            if let Some(path) = parent_path {
                if path.exists() {
                    return self.git.head_commit(&path).await;
                }
            }
        }
        self.git.head_commit(repo_root).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Release
    // ─────────────────────────────────────────────────────────────────────

    /// Release a session's working directory.
    ///
    /// Internal state is dropped before any git work, so a failing release
    /// still leaves the coordinator clean; the error is surfaced to the
    /// caller.
    pub async fn release(&self, session_id: &str, opts: &ReleaseOptions) -> Result<ReleaseOutcome> {
        let active = self
            .active
            .lock()
            .remove(session_id)
            .ok_or_else(|| WorktreeError::NotAcquired(session_id.to_string()))?;
        {
            let mut owners = self.main_owners.lock();
            owners.retain(|_, owner| owner != session_id);
        }

        let dir = active.dir;
        let repo_root = active.repo_root;

        // Checkout vanished from disk: record the release and prune.
        if !dir.path.exists() {
            self.emit_released(&dir, None, true, false).await;
            if let Some(root) = &repo_root {
                if let Err(e) = self.git.worktree_prune(root).await {
                    warn!(session_id, error = %e, "worktree prune failed");
                }
            }
            return Ok(ReleaseOutcome {
                directory: dir,
                final_commit: None,
                worktree_deleted: true,
                branch_deleted: false,
                merge: None,
            });
        }

        let mut final_commit = None;
        let wants_commit = self.config.auto_commit_on_release || opts.commit_message.is_some();
        if repo_root.is_some() && wants_commit && self.git.is_dirty(&dir.path).await? {
            let message = opts
                .commit_message
                .clone()
                .unwrap_or_else(|| format!("Session {session_id} auto-save"));
            self.git.stage_all(&dir.path).await?;
            let hash = self.git.commit(&dir.path, &message).await?;
            let stats = self.git.commit_stats(&dir.path, &hash).await.unwrap_or_default();
            self.emit(
                session_id,
                EventType::WorktreeCommit,
                json!({
                    "hash": hash,
                    "message": message,
                    "filesChanged": stats.files_changed,
                    "insertions": stats.insertions,
                    "deletions": stats.deletions,
                }),
            )
            .await;
            final_commit = Some(hash);
        }

        let mut merge = None;
        if let (Some(target), Some(root), true) = (&opts.merge_to, &repo_root, dir.isolated) {
            let outcome = self
                .merge_session_branch(session_id, root, &dir, target, opts.merge_strategy)
                .await;
            self.emit(
                session_id,
                EventType::WorktreeMerged,
                serde_json::to_value(&outcome).unwrap_or_else(|_| json!({})),
            )
            .await;
            merge = Some(outcome);
        }

        let mut worktree_deleted = false;
        let mut branch_deleted = false;
        if dir.isolated && self.config.delete_on_release {
            if let Some(root) = &repo_root {
                self.git.worktree_remove(root, &dir.path).await?;
                worktree_deleted = true;
                if !self.config.preserve_branches {
                    self.git.delete_branch(root, &dir.branch).await?;
                    branch_deleted = true;
                }
            }
        }

        self.emit_released(&dir, final_commit.as_deref(), worktree_deleted, branch_deleted)
            .await;

        Ok(ReleaseOutcome {
            directory: dir,
            final_commit,
            worktree_deleted,
            branch_deleted,
            merge,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Merge
    // ─────────────────────────────────────────────────────────────────────

    async fn merge_session_branch(
        &self,
        session_id: &str,
        repo_root: &Path,
        dir: &WorkingDirectory,
        target: &str,
        strategy: MergeStrategy,
    ) -> MergeOutcome {
        let result = self
            .try_merge(session_id, repo_root, dir, target, strategy)
            .await;

        match result {
            Ok(commit_hash) => MergeOutcome {
                success: true,
                strategy,
                source_branch: dir.branch.clone(),
                target_branch: target.to_string(),
                commit_hash: Some(commit_hash),
                conflicts: Vec::new(),
            },
            Err(err) => {
                let conflict_dir = if strategy == MergeStrategy::Rebase {
                    &dir.path
                } else {
                    repo_root
                };
                let mut conflicts = self
                    .git
                    .conflict_files(conflict_dir)
                    .await
                    .unwrap_or_default();
                self.git.merge_abort(repo_root).await;
                if conflicts.is_empty() {
                    conflicts = vec![err.to_string()];
                }
                warn!(session_id, target, strategy = strategy.as_str(), "merge failed");
                MergeOutcome {
                    success: false,
                    strategy,
                    source_branch: dir.branch.clone(),
                    target_branch: target.to_string(),
                    commit_hash: None,
                    conflicts,
                }
            }
        }
    }

    async fn try_merge(
        &self,
        session_id: &str,
        repo_root: &Path,
        dir: &WorkingDirectory,
        target: &str,
        strategy: MergeStrategy,
    ) -> Result<String> {
        match strategy {
            MergeStrategy::Merge => {
                self.git.checkout(repo_root, target).await?;
                let message = format!("Merge session {session_id} into {target}");
                let output = self.git.merge_no_ff(repo_root, &dir.branch, &message).await?;
                if !output.ok() {
                    return Err(WorktreeError::Git {
                        command: "merge --no-ff".into(),
                        exit_code: output.exit_code,
                        stderr: output.stderr.trim().to_string(),
                    });
                }
                self.git.head_commit(repo_root).await
            }
            MergeStrategy::Squash => {
                self.git.checkout(repo_root, target).await?;
                let output = self.git.merge_squash(repo_root, &dir.branch).await?;
                if !output.ok() {
                    return Err(WorktreeError::Git {
                        command: "merge --squash".into(),
                        exit_code: output.exit_code,
                        stderr: output.stderr.trim().to_string(),
                    });
                }
                self.git
                    .commit(repo_root, &format!("Squash merge session {session_id}"))
                    .await
            }
            MergeStrategy::Rebase => {
                let output = self.git.rebase(&dir.path, target).await?;
                if !output.ok() {
                    return Err(WorktreeError::Git {
                        command: "rebase".into(),
                        exit_code: output.exit_code,
                        stderr: output.stderr.trim().to_string(),
                    });
                }
                self.git.checkout(repo_root, target).await?;
                let ff = self.git.merge_ff_only(repo_root, &dir.branch).await?;
                if !ff.ok() {
                    return Err(WorktreeError::Git {
                        command: "merge --ff-only".into(),
                        exit_code: ff.exit_code,
                        stderr: ff.stderr.trim().to_string(),
                    });
                }
                self.git.head_commit(repo_root).await
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Recovery
    // ─────────────────────────────────────────────────────────────────────

    /// Sweep the worktree base directory for checkouts whose session is not
    /// currently active: commit dirty state, then remove the checkout while
    /// preserving its branch.
    pub async fn recover(&self, repo_root: &Path) -> Result<RecoverySummary> {
        let base_dir = repo_root.join(&self.config.base_dir_name);
        if !base_dir.exists() {
            return Ok(RecoverySummary::default());
        }

        let entries = std::fs::read_dir(&base_dir).map_err(|e| WorktreeError::Filesystem {
            path: base_dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut summary = RecoverySummary::default();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let session_id = entry.file_name().to_string_lossy().into_owned();
            if self.active.lock().contains_key(&session_id) {
                continue;
            }

            if self.git.is_dirty(&path).await.unwrap_or(false) {
                self.git.stage_all(&path).await?;
                let _ = self
                    .git
                    .commit(&path, &format!("Session {session_id} auto-recovery"))
                    .await?;
                summary.recovered += 1;
            }
            self.git.worktree_remove(repo_root, &path).await?;
            summary.deleted += 1;
        }

        info!(
            recovered = summary.recovered,
            deleted = summary.deleted,
            "worktree recovery sweep complete"
        );
        Ok(summary)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────

    fn register(&self, session_id: &str, dir: WorkingDirectory, repo_root: Option<PathBuf>) {
        let _ = self
            .active
            .lock()
            .insert(session_id.to_string(), ActiveWorktree { dir, repo_root });
    }

    async fn emit_acquired(&self, dir: &WorkingDirectory, opts: &AcquireOptions) {
        let mut payload = json!({
            "path": dir.path.display().to_string(),
            "branch": dir.branch,
            "baseCommit": dir.base_commit,
            "isolated": dir.isolated,
        });
        if let Some(parent) = &opts.parent_session_id {
            payload["forkedFrom"] = json!({
                "sessionId": parent,
                "commit": dir.base_commit,
            });
        }
        self.emit(&dir.session_id, EventType::WorktreeAcquired, payload).await;
    }

    async fn emit_released(
        &self,
        dir: &WorkingDirectory,
        final_commit: Option<&str>,
        worktree_deleted: bool,
        branch_deleted: bool,
    ) {
        let mut payload = json!({
            "path": dir.path.display().to_string(),
            "branch": dir.branch,
            "worktreeDeleted": worktree_deleted,
            "branchDeleted": branch_deleted,
        });
        if let Some(commit) = final_commit {
            payload["finalCommit"] = json!(commit);
        }
        self.emit(&dir.session_id, EventType::WorktreeReleased, payload).await;
    }

    /// Append a coordinator event. Failures are logged, never raised — event
    /// emission must not abort the underlying worktree operation.
    async fn emit(&self, session_id: &str, event_type: EventType, payload: serde_json::Value) {
        if let Err(e) = self.store.append(&AppendOptions {
            session_id,
            event_type,
            payload,
            parent_id: None,
        }) {
            warn!(session_id, event_type = %event_type, error = %e, "worktree event append failed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
