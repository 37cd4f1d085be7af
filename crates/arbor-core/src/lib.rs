//! Shared foundations for the Arbor runtime core.
//!
//! Every other crate in the workspace depends on this one for:
//!
//! - [`ids`]: prefixed, time-ordered entity ids (`ws_…`, `sess_…`, `evt_…`)
//! - [`errors`]: the two-axis error taxonomy (category × retryability)
//! - [`time`]: RFC 3339 timestamp helpers

pub mod errors;
pub mod ids;
pub mod time;

pub use errors::{CoreError, ErrorCategory, Result};
pub use ids::{new_blob_id, new_branch_id, new_event_id, new_handoff_id, new_session_id, new_workspace_id};
pub use time::now_iso;
