//! Git CLI driver.
//!
//! Thin async wrapper over the `git` binary via `tokio::process::Command`.
//! Every invocation carries a timeout (default 30 s) and a cancellation
//! token; children are spawned with `kill_on_drop`, so a timed-out or
//! cancelled invocation terminates the subprocess and discards its output.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, WorktreeError};

/// Output of a completed git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
}

impl GitOutput {
    /// Whether the process exited successfully.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.exit_code == 0
    }
}

/// One commit's stat summary.
#[derive(Debug, Clone, Default)]
pub struct CommitStats {
    /// Paths touched.
    pub files_changed: Vec<String>,
    /// Lines added.
    pub insertions: i64,
    /// Lines removed.
    pub deletions: i64,
}

/// Async git CLI driver.
#[derive(Clone)]
pub struct GitCli {
    timeout: Duration,
    cancel: CancellationToken,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), CancellationToken::new())
    }
}

impl GitCli {
    /// Create a driver with the given subprocess timeout and cancel token.
    #[must_use]
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    /// Run `git <args>` in `dir`, returning the raw output.
    pub async fn run(&self, dir: &Path, args: &[&str]) -> Result<GitOutput> {
        let command = args.first().copied().unwrap_or("git").to_string();

        let mut cmd = tokio::process::Command::new("git");
        let _ = cmd
            .args(args)
            .current_dir(dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        debug!(?args, dir = %dir.display(), "running git");

        let child = cmd
            .spawn()
            .map_err(|e| WorktreeError::Spawn(e.to_string()))?;

        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| WorktreeError::Spawn(e.to_string()))?
            }
            () = tokio::time::sleep(self.timeout) => {
                return Err(WorktreeError::Timeout {
                    command,
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            () = self.cancel.cancelled() => {
                return Err(WorktreeError::Cancelled { command });
            }
        };

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Run `git <args>` and fail on a non-zero exit code.
    pub async fn run_ok(&self, dir: &Path, args: &[&str]) -> Result<GitOutput> {
        let output = self.run(dir, args).await?;
        if !output.ok() {
            return Err(WorktreeError::Git {
                command: args.join(" "),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    // ── Repository queries ───────────────────────────────────────────────

    /// Detect the repository root containing `dir`, if any.
    pub async fn repo_root(&self, dir: &Path) -> Result<Option<std::path::PathBuf>> {
        let output = self.run(dir, &["rev-parse", "--show-toplevel"]).await?;
        if output.ok() {
            Ok(Some(std::path::PathBuf::from(output.stdout.trim())))
        } else {
            Ok(None)
        }
    }

    /// Current HEAD commit hash.
    pub async fn head_commit(&self, dir: &Path) -> Result<String> {
        let output = self.run_ok(dir, &["rev-parse", "HEAD"]).await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Currently checked-out branch name, or `None` when detached.
    pub async fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        let output = self.run_ok(dir, &["branch", "--show-current"]).await?;
        let name = output.stdout.trim();
        Ok(if name.is_empty() { None } else { Some(name.to_string()) })
    }

    /// Whether the working tree has uncommitted changes (staged, unstaged, or
    /// untracked).
    pub async fn is_dirty(&self, dir: &Path) -> Result<bool> {
        let output = self.run_ok(dir, &["status", "--porcelain"]).await?;
        Ok(!output.stdout.trim().is_empty())
    }

    /// Whether a local branch exists.
    pub async fn branch_exists(&self, dir: &Path, branch: &str) -> Result<bool> {
        let output = self
            .run(dir, &["rev-parse", "--verify", &format!("refs/heads/{branch}")])
            .await?;
        Ok(output.ok())
    }

    /// Paths with unresolved merge conflicts.
    pub async fn conflict_files(&self, dir: &Path) -> Result<Vec<String>> {
        let output = self
            .run(dir, &["diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Stage every change in the working tree.
    pub async fn stage_all(&self, dir: &Path) -> Result<()> {
        let _ = self.run_ok(dir, &["add", "-A"]).await?;
        Ok(())
    }

    /// Commit staged changes and return the new commit hash.
    pub async fn commit(&self, dir: &Path, message: &str) -> Result<String> {
        let _ = self.run_ok(dir, &["commit", "-m", message]).await?;
        self.head_commit(dir).await
    }

    /// Stats for a commit: touched files and line deltas.
    pub async fn commit_stats(&self, dir: &Path, commit: &str) -> Result<CommitStats> {
        let output = self
            .run_ok(dir, &["show", "--numstat", "--format=", commit])
            .await?;

        let mut stats = CommitStats::default();
        for line in output.stdout.lines() {
            let mut parts = line.split('\t');
            let (Some(ins), Some(del), Some(path)) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            // Binary files report "-" for both counts.
            stats.insertions += ins.trim().parse::<i64>().unwrap_or(0);
            stats.deletions += del.trim().parse::<i64>().unwrap_or(0);
            stats.files_changed.push(path.trim().to_string());
        }
        Ok(stats)
    }

    /// Create a branch pointing at `commit`.
    pub async fn create_branch_at(&self, dir: &Path, branch: &str, commit: &str) -> Result<()> {
        let _ = self.run_ok(dir, &["branch", branch, commit]).await?;
        Ok(())
    }

    /// Force-delete a local branch.
    pub async fn delete_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let _ = self.run_ok(dir, &["branch", "-D", branch]).await?;
        Ok(())
    }

    /// Check out a branch.
    pub async fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        let _ = self.run_ok(dir, &["checkout", branch]).await?;
        Ok(())
    }

    /// Add a worktree checkout of an existing branch.
    pub async fn worktree_add(&self, dir: &Path, path: &Path, branch: &str) -> Result<()> {
        let path_str = path.to_string_lossy();
        let _ = self
            .run_ok(dir, &["worktree", "add", path_str.as_ref(), branch])
            .await?;
        Ok(())
    }

    /// Remove a worktree checkout (forced).
    pub async fn worktree_remove(&self, dir: &Path, path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        let _ = self
            .run_ok(dir, &["worktree", "remove", "--force", path_str.as_ref()])
            .await?;
        Ok(())
    }

    /// Prune stale worktree registrations.
    pub async fn worktree_prune(&self, dir: &Path) -> Result<()> {
        let _ = self.run_ok(dir, &["worktree", "prune"]).await?;
        Ok(())
    }

    /// Non-fast-forward merge of `branch` into the current branch.
    pub async fn merge_no_ff(&self, dir: &Path, branch: &str, message: &str) -> Result<GitOutput> {
        self.run(dir, &["merge", "--no-ff", branch, "-m", message]).await
    }

    /// Squash-merge `branch` into the current branch (leaves staged changes).
    pub async fn merge_squash(&self, dir: &Path, branch: &str) -> Result<GitOutput> {
        self.run(dir, &["merge", "--squash", branch]).await
    }

    /// Fast-forward-only merge of `branch` into the current branch.
    pub async fn merge_ff_only(&self, dir: &Path, branch: &str) -> Result<GitOutput> {
        self.run(dir, &["merge", "--ff-only", branch]).await
    }

    /// Rebase the current branch onto `target`.
    pub async fn rebase(&self, dir: &Path, target: &str) -> Result<GitOutput> {
        self.run(dir, &["rebase", target]).await
    }

    /// Abort an in-progress merge, ignoring errors.
    pub async fn merge_abort(&self, dir: &Path) {
        let _ = self.run(dir, &["merge", "--abort"]).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
