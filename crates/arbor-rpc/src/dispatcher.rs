//! The RPC dispatcher: middleware chain wrapped around registry dispatch.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::middleware::{
    ErrorBoundaryMiddleware, LoggingMiddleware, MiddlewareChain, TimingMiddleware,
};
use crate::registry::MethodRegistry;
use crate::types::{RpcRequest, RpcResponse};

/// Dispatches request envelopes through the middleware chain into the method
/// registry.
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    chain: MiddlewareChain,
    context: Arc<RpcContext>,
}

impl Dispatcher {
    /// Create a dispatcher with a custom middleware chain.
    #[must_use]
    pub fn new(registry: MethodRegistry, chain: MiddlewareChain, context: RpcContext) -> Self {
        Self {
            registry: Arc::new(registry),
            chain,
            context: Arc::new(context),
        }
    }

    /// Create a dispatcher with the standard middleware stack: timing,
    /// structured logging, and an error boundary so callers always get an
    /// envelope back.
    #[must_use]
    pub fn with_standard_middleware(registry: MethodRegistry, context: RpcContext) -> Self {
        let chain = MiddlewareChain::new()
            .with(TimingMiddleware)
            .with(LoggingMiddleware)
            .with(ErrorBoundaryMiddleware);
        Self::new(registry, chain, context)
    }

    /// The handler context.
    #[must_use]
    pub fn context(&self) -> &Arc<RpcContext> {
        &self.context
    }

    /// The method registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Dispatch one request.
    ///
    /// Handler and validation errors become error envelopes inside the
    /// registry; middleware failures propagate per the chain's `on_error`
    /// configuration.
    pub async fn dispatch(&self, request: RpcRequest) -> Result<RpcResponse, RpcError> {
        let registry = Arc::clone(&self.registry);
        let context = Arc::clone(&self.context);

        let endpoint = move |req: RpcRequest| -> BoxFuture<'static, RpcResponse> {
            let registry = Arc::clone(&registry);
            let context = Arc::clone(&context);
            Box::pin(async move { registry.dispatch(req, &context).await })
        };

        self.chain.execute(request, &endpoint).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
