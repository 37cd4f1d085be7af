//! RPC wire-format envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming RPC request from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    /// Unique request identifier.
    pub id: String,
    /// Method name (e.g. `session.create`).
    pub method: String,
    /// Optional parameters object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Outgoing RPC response to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Structured error body inside an [`RpcResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable error code (e.g. `SESSION_NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(RpcErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let raw = r#"{"id": "req_1", "method": "session.create", "params": {"model": "m"}}"#;
        let req: RpcRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.id, "req_1");
        assert_eq!(req.method, "session.create");
        assert_eq!(req.params.unwrap()["model"], "m");
    }

    #[test]
    fn request_without_params_omits_field() {
        let req = RpcRequest {
            id: "req_2".into(),
            method: "system.ping".into(),
            params: None,
        };
        assert!(!serde_json::to_string(&req).unwrap().contains("params"));
    }

    #[test]
    fn success_response_shape() {
        let resp = RpcResponse::success("req_1", json!({"sessionId": "sess_1"}));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["success"], true);
        assert!(v.get("error").is_none());
        assert_eq!(v["result"]["sessionId"], "sess_1");
    }

    #[test]
    fn error_response_shape() {
        let resp = RpcResponse::error("req_2", "SESSION_NOT_FOUND", "No such session");
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["success"], false);
        assert!(v.get("result").is_none());
        assert_eq!(v["error"]["code"], "SESSION_NOT_FOUND");
    }

    #[test]
    fn wire_format_error_response_parses() {
        let raw = r#"{"id": "r", "success": false, "error": {"code": "INVALID_PARAMS", "message": "bad"}}"#;
        let resp: RpcResponse = serde_json::from_str(raw).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, "INVALID_PARAMS");
    }
}
