//! Method registry and async dispatch.
//!
//! Methods register with [`MethodOptions`] declaring required parameters and
//! managers. Dispatch validates both before the handler runs: unknown method
//! → `METHOD_NOT_FOUND`, missing manager → `NOT_SUPPORTED`, missing
//! parameter → `INVALID_PARAMS` naming the parameter. Duplicate registration
//! overwrites the previous handler with a warning.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::warn;

use crate::context::RpcContext;
use crate::errors::{self, RpcError};
use crate::types::{RpcRequest, RpcResponse};

/// Trait implemented by every RPC method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError>;
}

/// Per-method registration options.
#[derive(Clone, Debug, Default)]
pub struct MethodOptions {
    /// Parameters that must be present in `params`.
    pub required_params: Vec<&'static str>,
    /// Managers (by context name) that must be configured.
    pub required_managers: Vec<&'static str>,
}

impl MethodOptions {
    /// Options with required parameters only.
    #[must_use]
    pub fn params(required_params: &[&'static str]) -> Self {
        Self {
            required_params: required_params.to_vec(),
            required_managers: Vec::new(),
        }
    }

    /// Add required managers.
    #[must_use]
    pub fn managers(mut self, required_managers: &[&'static str]) -> Self {
        self.required_managers = required_managers.to_vec();
        self
    }
}

struct RegisteredMethod {
    handler: Arc<dyn MethodHandler>,
    options: MethodOptions,
}

/// Registry mapping method names to handlers.
#[derive(Default)]
pub struct MethodRegistry {
    handlers: HashMap<String, RegisteredMethod>,
}

impl MethodRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a method name. Re-registering overwrites the
    /// previous handler with a warning.
    pub fn register(
        &mut self,
        method: &str,
        handler: impl MethodHandler + 'static,
        options: MethodOptions,
    ) {
        if self.handlers.contains_key(method) {
            warn!(method, "overwriting existing RPC method registration");
        }
        let _ = self.handlers.insert(
            method.to_owned(),
            RegisteredMethod {
                handler: Arc::new(handler),
                options,
            },
        );
    }

    /// Dispatch a request to the appropriate handler.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &RpcContext) -> RpcResponse {
        let method = request.method.clone();
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        let Some(registered) = self.handlers.get(&method) else {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => errors::METHOD_NOT_FOUND)
                .increment(1);
            let err = RpcError::MethodNotFound { method };
            return RpcResponse {
                id: request.id,
                success: false,
                result: None,
                error: Some(err.to_error_body()),
            };
        };

        if let Err(err) = validate(&registered.options, request.params.as_ref(), ctx) {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.code().to_owned())
                .increment(1);
            return RpcResponse {
                id: request.id,
                success: false,
                result: None,
                error: Some(err.to_error_body()),
            };
        }

        let start = std::time::Instant::now();
        let response = match registered.handler.handle(request.params, ctx).await {
            Ok(result) => RpcResponse::success(&request.id, result),
            Err(err) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.code().to_owned())
                    .increment(1);
                RpcResponse {
                    id: request.id,
                    success: false,
                    result: None,
                    error: Some(err.to_error_body()),
                }
            }
        };

        let duration = start.elapsed();
        histogram!("rpc_request_duration_seconds", "method" => method.clone())
            .record(duration.as_secs_f64());
        if duration.as_secs() >= 5 {
            warn!(method, duration_secs = duration.as_secs_f64(), "slow RPC request");
        }

        response
    }

    /// List all registered method names (sorted).
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a method is registered.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

/// Manager checks run before parameter checks, so a misconfigured server
/// answers `NOT_SUPPORTED` even for malformed requests.
fn validate(
    options: &MethodOptions,
    params: Option<&Value>,
    ctx: &RpcContext,
) -> Result<(), RpcError> {
    for manager in &options.required_managers {
        if !ctx.has_manager(manager) {
            return Err(RpcError::manager_missing(manager));
        }
    }
    for param in &options.required_params {
        let present = params.is_some_and(|p| p.get(param).is_some_and(|v| !v.is_null()));
        if !present {
            return Err(RpcError::invalid_params(format!(
                "Missing required parameter: {param}"
            )));
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
