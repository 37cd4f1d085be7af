//! Memory layer: recall, handoffs, the workspace ledger, canvas artifacts.
//!
//! - [`Recall`]: FTS-backed search and typed queries over the event log
//! - [`HandoffStore`]: finalized session summaries in their own database
//! - [`LedgerStore`]: per-workspace structured progress document
//! - [`SessionEndHandoffHook`]: automatic handoff creation at session end
//! - [`CanvasStore`]: file-per-artifact JSON documents

pub mod artifacts;
pub mod errors;
pub mod handoff;
pub mod handoff_hook;
pub mod ledger;
pub mod recall;

pub use artifacts::CanvasStore;
pub use errors::{MemoryError, Result};
pub use handoff::{CodeChange, HandoffRecord, HandoffSearchResult, HandoffStore, NewHandoff};
pub use handoff_hook::{DEFAULT_MIN_MESSAGES, SessionEndHandoffHook};
pub use ledger::{Decision, Ledger, LedgerPatch, LedgerStore};
pub use recall::{Recall, RecallFilters};
