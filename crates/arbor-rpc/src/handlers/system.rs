//! System handlers: ping, stats.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Liveness check.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({
            "pong": true,
            "uptimeSeconds": ctx.server_start.elapsed().as_secs(),
        }))
    }
}

/// Aggregate store totals.
pub struct StatsHandler;

#[async_trait]
impl MethodHandler for StatsHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let stats = ctx.event_store.stats()?;
        Ok(serde_json::to_value(stats).unwrap_or(Value::Null))
    }
}
