//! RPC dispatcher for the Arbor runtime core.
//!
//! Translates `{id, method, params}` request envelopes into
//! `{id, success, result|error{code, message}}` responses through a
//! registered handler table with declared parameter and manager
//! requirements, wrapped in a composable middleware chain (timing, logging,
//! error boundary).

pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod types;

pub use context::RpcContext;
pub use dispatcher::Dispatcher;
pub use errors::RpcError;
pub use handlers::register_all;
pub use middleware::{
    ErrorBoundaryMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, Next, TimingMiddleware,
};
pub use registry::{MethodHandler, MethodOptions, MethodRegistry};
pub use types::{RpcErrorBody, RpcRequest, RpcResponse};
