//! Git worktree isolation and lifecycle coordination for parallel sessions.
//!
//! The [`WorktreeCoordinator`] decides whether a session runs in the
//! repository's main checkout or an isolated sibling checkout, drives the git
//! CLI to create/commit/merge/remove those checkouts, emits an event through
//! the store for every transition, and sweeps up orphaned checkouts after a
//! crash.

pub mod coordinator;
pub mod errors;
pub mod git;
pub mod policy;
pub mod types;

pub use coordinator::WorktreeCoordinator;
pub use errors::{Result, WorktreeError};
pub use git::{CommitStats, GitCli, GitOutput};
pub use policy::{IsolationInputs, should_isolate};
pub use types::{
    AcquireOptions, IsolationMode, MergeOutcome, MergeStrategy, RecoverySummary, ReleaseOptions,
    ReleaseOutcome, WorkingDirectory, WorktreeConfig,
};
