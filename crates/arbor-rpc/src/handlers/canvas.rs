//! Canvas handlers: get, save, list.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{require_param, require_string_param};
use crate::registry::MethodHandler;

/// Load a canvas document.
pub struct GetCanvasHandler;

#[async_trait]
impl MethodHandler for GetCanvasHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let canvas_id = require_string_param(params.as_ref(), "canvasId")?;
        let canvases = ctx.require_canvases()?;
        let document = canvases.get(&canvas_id)?;
        Ok(json!({"canvasId": canvas_id, "document": document}))
    }
}

/// Save (or overwrite) a canvas document.
pub struct SaveCanvasHandler;

#[async_trait]
impl MethodHandler for SaveCanvasHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let canvas_id = require_string_param(params.as_ref(), "canvasId")?;
        let document = require_param(params.as_ref(), "document")?.clone();
        let canvases = ctx.require_canvases()?;
        canvases.save(&canvas_id, &document)?;
        Ok(json!({"canvasId": canvas_id, "saved": true}))
    }
}

/// List stored canvas ids.
pub struct ListCanvasesHandler;

#[async_trait]
impl MethodHandler for ListCanvasesHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let canvases = ctx.require_canvases()?;
        Ok(json!({"canvases": canvases.list()?}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;

    #[tokio::test]
    async fn save_get_list() {
        let ctx = make_test_context();
        let saved = SaveCanvasHandler
            .handle(
                Some(json!({"canvasId": "plan-1", "document": {"title": "Plan"}})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(saved["saved"], true);

        let loaded = GetCanvasHandler
            .handle(Some(json!({"canvasId": "plan-1"})), &ctx)
            .await
            .unwrap();
        assert_eq!(loaded["document"]["title"], "Plan");

        let listed = ListCanvasesHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(listed["canvases"][0], "plan-1");
    }

    #[tokio::test]
    async fn traversal_id_rejected() {
        let ctx = make_test_context();
        let err = SaveCanvasHandler
            .handle(
                Some(json!({"canvasId": "../escape", "document": {}})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }
}
