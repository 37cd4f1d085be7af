//! Composable middleware chain around RPC dispatch.
//!
//! Middlewares are `async (request, next) → response` functions composed as
//! an onion: the first middleware's pre-phase runs first and its post-phase
//! runs last. A middleware may short-circuit by returning a response without
//! calling `next`, rewrite the request before calling `next`, or rewrite the
//! response coming back. A middleware that fails is formatted by the chain's
//! optional `on_error` hook; without one the error propagates to the caller.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use metrics::histogram;
use tracing::{debug, error, warn};

use crate::errors::RpcError;
use crate::types::{RpcRequest, RpcResponse};

/// Result type flowing through the chain.
pub type MiddlewareResult = Result<RpcResponse, RpcError>;

/// Terminal endpoint the chain wraps (normally registry dispatch).
pub type Endpoint<'a> = &'a (dyn Fn(RpcRequest) -> BoxFuture<'static, RpcResponse> + Send + Sync);

/// One layer in the middleware chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle the request, calling `next.run(request)` to continue inward.
    async fn handle(&self, request: RpcRequest, next: Next<'_>) -> MiddlewareResult;
}

/// The remainder of the chain from a middleware's point of view.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    endpoint: Endpoint<'a>,
}

impl Next<'_> {
    /// Run the rest of the chain with the (possibly rewritten) request.
    pub async fn run(self, request: RpcRequest) -> MiddlewareResult {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                current
                    .handle(
                        request,
                        Next {
                            middlewares: rest,
                            endpoint: self.endpoint,
                        },
                    )
                    .await
            }
            None => Ok((self.endpoint)(request).await),
        }
    }
}

/// Formats a middleware error into a response when installed on the chain.
pub type ErrorFormatter = dyn Fn(&str, &RpcError) -> RpcResponse + Send + Sync;

/// An ordered middleware chain.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    on_error: Option<Box<ErrorFormatter>>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
            on_error: None,
        }
    }

    /// Append a middleware (outermost first).
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Install the error formatter.
    #[must_use]
    pub fn on_error(
        mut self,
        formatter: impl Fn(&str, &RpcError) -> RpcResponse + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(formatter));
        self
    }

    /// Number of installed middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the chain around `endpoint`.
    ///
    /// A middleware error is formatted by `on_error` when installed;
    /// otherwise it propagates as `Err`.
    pub async fn execute(
        &self,
        request: RpcRequest,
        endpoint: Endpoint<'_>,
    ) -> MiddlewareResult {
        let request_id = request.id.clone();
        let next = Next {
            middlewares: &self.middlewares,
            endpoint,
        };
        match next.run(request).await {
            Ok(response) => Ok(response),
            Err(err) => match &self.on_error {
                Some(format) => Ok(format(&request_id, &err)),
                None => Err(err),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Standard middlewares
// ─────────────────────────────────────────────────────────────────────────────

/// Logs method name and elapsed milliseconds; records a latency histogram.
pub struct TimingMiddleware;

#[async_trait]
impl Middleware for TimingMiddleware {
    async fn handle(&self, request: RpcRequest, next: Next<'_>) -> MiddlewareResult {
        let method = request.method.clone();
        let start = Instant::now();
        let result = next.run(request).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        histogram!("rpc_middleware_duration_ms", "method" => method.clone()).record(elapsed_ms);
        debug!(method, elapsed_ms, "rpc timing");
        result
    }
}

/// Structured request/response logging: request and success at debug,
/// error responses at warn, propagating failures at error.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, request: RpcRequest, next: Next<'_>) -> MiddlewareResult {
        let method = request.method.clone();
        let id = request.id.clone();
        debug!(method, id, "rpc request");

        match next.run(request).await {
            Ok(response) => {
                if response.success {
                    debug!(method, id, "rpc success");
                } else {
                    let code = response.error.as_ref().map_or("", |e| e.code.as_str());
                    warn!(method, id, code, "rpc error response");
                }
                Ok(response)
            }
            Err(err) => {
                error!(method, id, code = err.code(), error = %err, "rpc middleware failure");
                Err(err)
            }
        }
    }
}

/// Converts inner-chain failures into structured error responses, so nothing
/// outside this layer ever sees an `Err`.
pub struct ErrorBoundaryMiddleware;

#[async_trait]
impl Middleware for ErrorBoundaryMiddleware {
    async fn handle(&self, request: RpcRequest, next: Next<'_>) -> MiddlewareResult {
        let id = request.id.clone();
        match next.run(request).await {
            Ok(response) => Ok(response),
            Err(err) => Ok(RpcResponse {
                id,
                success: false,
                result: None,
                error: Some(err.to_error_body()),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
