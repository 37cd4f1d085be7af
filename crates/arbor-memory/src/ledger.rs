//! Per-workspace ledger — a live, structured progress document.
//!
//! The ledger is not event-sourced: it persists as a single JSON row per
//! workspace with total-replace semantics. Mutating operations load the
//! current document, change it, and write the whole thing back.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use arbor_events::ConnectionPool;

use crate::errors::Result;

/// A decision with its rationale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// What was chosen.
    pub choice: String,
    /// Why it was chosen.
    pub reason: String,
}

/// The workspace ledger document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ledger {
    /// The overall goal.
    pub goal: Option<String>,
    /// Standing constraints.
    pub constraints: Vec<String>,
    /// Completed items.
    pub done: Vec<String>,
    /// What is being worked on right now.
    pub now: Option<String>,
    /// Queued next steps.
    pub next: Vec<String>,
    /// Decisions made along the way.
    pub decisions: Vec<Decision>,
    /// Files currently in play (set semantics).
    pub working_files: Vec<String>,
}

/// Partial update for [`LedgerStore::update`]; present fields replace.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPatch {
    /// Replace the goal.
    pub goal: Option<String>,
    /// Replace the constraints list.
    pub constraints: Option<Vec<String>>,
    /// Replace the done list.
    pub done: Option<Vec<String>>,
    /// Replace the current focus.
    pub now: Option<String>,
    /// Replace the next list.
    pub next: Option<Vec<String>>,
    /// Replace the decisions list.
    pub decisions: Option<Vec<Decision>>,
    /// Replace the working files set.
    pub working_files: Option<Vec<String>>,
}

/// Store for workspace ledgers (shares the memory database pool).
pub struct LedgerStore {
    pool: ConnectionPool,
}

impl LedgerStore {
    /// Create a store over the memory database pool.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Load the workspace's ledger (empty document when none exists).
    pub fn load(&self, workspace_id: &str) -> Result<Ledger> {
        let conn = self.pool.get()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM ledgers WHERE workspace_id = ?1",
                params![workspace_id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Ledger::default()),
        }
    }

    /// Replace the workspace's ledger wholesale.
    pub fn save(&self, workspace_id: &str, ledger: &Ledger) -> Result<()> {
        let conn = self.pool.get()?;
        let data = serde_json::to_string(ledger)?;
        let now = arbor_core::now_iso();
        let _ = conn.execute(
            "INSERT INTO ledgers (workspace_id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(workspace_id) DO UPDATE SET data = ?2, updated_at = ?3",
            params![workspace_id, data, now],
        )?;
        Ok(())
    }

    fn mutate(&self, workspace_id: &str, f: impl FnOnce(&mut Ledger)) -> Result<Ledger> {
        let mut ledger = self.load(workspace_id)?;
        f(&mut ledger);
        self.save(workspace_id, &ledger)?;
        Ok(ledger)
    }

    /// Set the goal.
    pub fn set_goal(&self, workspace_id: &str, goal: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| l.goal = Some(goal.to_string()))
    }

    /// Set the current focus.
    pub fn set_now(&self, workspace_id: &str, now: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| l.now = Some(now.to_string()))
    }

    /// Append a completed item.
    pub fn add_done(&self, workspace_id: &str, item: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| l.done.push(item.to_string()))
    }

    /// Queue a next step.
    pub fn add_next(&self, workspace_id: &str, item: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| l.next.push(item.to_string()))
    }

    /// Pop the front of the next queue into the current focus. Returns the
    /// popped item, if any.
    pub fn pop_next(&self, workspace_id: &str) -> Result<Option<String>> {
        let mut popped = None;
        let _ = self.mutate(workspace_id, |l| {
            if !l.next.is_empty() {
                let item = l.next.remove(0);
                l.now = Some(item.clone());
                popped = Some(item);
            }
        })?;
        Ok(popped)
    }

    /// Move the current focus into done and clear it.
    pub fn complete_now(&self, workspace_id: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| {
            if let Some(now) = l.now.take() {
                l.done.push(now);
            }
        })
    }

    /// Record a decision.
    pub fn add_decision(&self, workspace_id: &str, choice: &str, reason: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| {
            l.decisions.push(Decision {
                choice: choice.to_string(),
                reason: reason.to_string(),
            });
        })
    }

    /// Add a working file (set semantics).
    pub fn add_working_file(&self, workspace_id: &str, path: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| {
            if !l.working_files.iter().any(|p| p == path) {
                l.working_files.push(path.to_string());
            }
        })
    }

    /// Remove a working file.
    pub fn remove_working_file(&self, workspace_id: &str, path: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| l.working_files.retain(|p| p != path))
    }

    /// Add a constraint.
    pub fn add_constraint(&self, workspace_id: &str, constraint: &str) -> Result<Ledger> {
        self.mutate(workspace_id, |l| l.constraints.push(constraint.to_string()))
    }

    /// Apply a partial update: present fields replace, absent fields stay.
    pub fn update(&self, workspace_id: &str, patch: &LedgerPatch) -> Result<Ledger> {
        self.mutate(workspace_id, |l| {
            if let Some(goal) = &patch.goal {
                l.goal = Some(goal.clone());
            }
            if let Some(constraints) = &patch.constraints {
                l.constraints = constraints.clone();
            }
            if let Some(done) = &patch.done {
                l.done = done.clone();
            }
            if let Some(now) = &patch.now {
                l.now = Some(now.clone());
            }
            if let Some(next) = &patch.next {
                l.next = next.clone();
            }
            if let Some(decisions) = &patch.decisions {
                l.decisions = decisions.clone();
            }
            if let Some(files) = &patch.working_files {
                l.working_files = files.clone();
            }
        })
    }

    /// Reset the workspace's ledger to empty.
    pub fn clear(&self, workspace_id: &str) -> Result<()> {
        self.save(workspace_id, &Ledger::default())
    }

    /// Context injection text for session start: present only when a goal is
    /// set.
    pub fn context_injection(&self, workspace_id: &str) -> Result<Option<String>> {
        let ledger = self.load(workspace_id)?;
        let Some(goal) = &ledger.goal else {
            return Ok(None);
        };

        let mut text = format!("## Workspace ledger\n\nGoal: {goal}\n");
        if let Some(now) = &ledger.now {
            text.push_str(&format!("Now: {now}\n"));
        }
        if !ledger.next.is_empty() {
            text.push_str(&format!("Next: {}\n", ledger.next.join("; ")));
        }
        if !ledger.constraints.is_empty() {
            text.push_str(&format!("Constraints: {}\n", ledger.constraints.join("; ")));
        }
        Ok(Some(text))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
