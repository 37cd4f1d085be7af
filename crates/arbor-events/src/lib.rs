//! Transactional, FTS-indexed event store for Arbor sessions.
//!
//! The store persists the workspace/session/event/blob/branch graph in a
//! single embedded `SQLite` database with full-text search over event
//! payloads. All mutations go through [`EventStore`], whose write methods are
//! single transactions: a failed operation leaves no partial state.
//!
//! Layering, bottom up:
//!
//! - [`sqlite::connection`] — r2d2 pool with WAL/foreign-key pragmas
//! - [`sqlite::migrations`] — numbered, embedded schema migrations
//! - [`sqlite::repositories`] — stateless per-table repositories
//! - [`store::EventStore`] — the transactional facade everything else uses

pub mod errors;
pub mod sqlite;
pub mod store;
pub mod types;

pub use errors::{EventStoreError, Result};
pub use sqlite::connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};
pub use sqlite::migrations::run_migrations;
pub use sqlite::repositories::branch::CreateBranchOptions;
pub use sqlite::repositories::event::ListEventsOptions;
pub use sqlite::repositories::search::SearchOptions;
pub use sqlite::repositories::session::ListSessionsOptions;
pub use sqlite::row_types::{BlobRow, BranchRow, EventRow, SessionRow, WorkspaceRow};
pub use store::{AppendOptions, CreateSessionResult, EventStore, NewSessionOptions};
pub use types::{ALL_EVENT_TYPES, EventType, SearchResult, SessionEvent, SessionEventPayload, StoreStats};
