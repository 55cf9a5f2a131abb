//! Control protocol messages.
//!
//! A request names a [`Method`] and carries a client-chosen id; the reply
//! echoes the id with either a `result` or an `error`, never both.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Everything the daemon answers on its control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "health")]
    Health,
    #[serde(rename = "shutdown")]
    Shutdown,
    /// Listener addresses, pending pairing slots, accepted count.
    #[serde(rename = "engine.status")]
    EngineStatus,
    /// Persist and clear the acceptance log.
    #[serde(rename = "engine.flush")]
    EngineFlush,
    /// Clear the acceptance log without persisting.
    #[serde(rename = "engine.reset")]
    EngineReset,
    #[serde(rename = "engine.records")]
    EngineRecords,
    /// Recent activity lines. Optional `limit` param.
    #[serde(rename = "engine.activity")]
    EngineActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params: None,
        }
    }

    pub fn with_params(method: Method, params: Value) -> Self {
        Self {
            params: Some(params),
            ..Self::new(method)
        }
    }

    /// Unsigned integer parameter, `None` when absent or not a `u64`.
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.as_ref()?.get(key)?.as_u64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code, self.message)
    }
}

impl Response {
    pub fn success(id: &str, result: Value) -> Self {
        Self {
            id: id.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: &str, code: i32, message: &str) -> Self {
        Self {
            id: id.to_string(),
            result: None,
            error: Some(ErrorInfo {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    /// Attach structured details to an error response. No-op on success.
    pub fn with_error_data(mut self, data: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.data = Some(data);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// The result payload, or the error. A reply with neither counts as
    /// an empty result.
    pub fn into_result(self) -> Result<Value, ErrorInfo> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC style error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Engine is not in a state that allows the operation.
    pub const ENGINE_STATE: i32 = -32010;
    /// The persistence sink rejected a batch.
    pub const PERSISTENCE_FAILED: i32 = -32011;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = Request::new(Method::EngineFlush);
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["method"], "engine.flush");
        assert!(wire.get("params").is_none());
        assert_eq!(wire["id"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_request_params() {
        let request = Request::with_params(Method::EngineActivity, json!({ "limit": 20 }));
        assert_eq!(request.param_u64("limit"), Some(20));
        assert_eq!(request.param_u64("missing"), None);
        assert_eq!(Request::new(Method::EngineActivity).param_u64("limit"), None);

        let negative = Request::with_params(Method::EngineActivity, json!({ "limit": -1 }));
        assert_eq!(negative.param_u64("limit"), None);
    }

    #[test]
    fn test_method_names() {
        let methods = [
            (Method::Health, "health"),
            (Method::Shutdown, "shutdown"),
            (Method::EngineStatus, "engine.status"),
            (Method::EngineFlush, "engine.flush"),
            (Method::EngineReset, "engine.reset"),
            (Method::EngineRecords, "engine.records"),
            (Method::EngineActivity, "engine.activity"),
        ];

        for (method, name) in methods {
            assert_eq!(serde_json::to_value(method).unwrap(), json!(name));
            assert_eq!(serde_json::from_value::<Method>(json!(name)).unwrap(), method);
        }
    }

    #[test]
    fn test_persistence_failure_carries_record_count() {
        let response = Response::error("7", error_codes::PERSISTENCE_FAILED, "disk full")
            .with_error_data(json!({ "records": 3 }));
        let wire = serde_json::to_value(&response).unwrap();

        assert_eq!(wire["error"]["code"], -32011);
        assert_eq!(wire["error"]["data"]["records"], 3);
        assert!(wire.get("result").is_none());

        let error = response.into_result().unwrap_err();
        assert_eq!(error.to_string(), "error -32011: disk full");
    }

    #[test]
    fn test_error_data_ignored_on_success() {
        let response = Response::success("1", json!({ "saved": 2 })).with_error_data(json!(1));
        assert!(response.is_success());
        assert_eq!(response.into_result().unwrap()["saved"], 2);
    }

    #[test]
    fn test_unknown_method_fails_to_parse() {
        assert!(
            serde_json::from_str::<Request>(r#"{"id":"1","method":"engine.explode"}"#).is_err()
        );
    }
}
