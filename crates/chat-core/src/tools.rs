//! Function dispatch seam between a run and the local tool handlers.
//!
//! The model asks for functions by name with JSON arguments. A
//! [`FunctionDispatcher`] turns each request into a JSON result object that
//! always carries a `status` field, so a failing handler never aborts the run
//! that asked for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::conversation::ToolCall;
use crate::events::ProgressSink;

/// Normalized outcome of a function invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    NotFound,
    Error,
    FunctionNotFound,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Success => "success",
            ToolStatus::NotFound => "not_found",
            ToolStatus::Error => "error",
            ToolStatus::FunctionNotFound => "function_not_found",
        }
    }
}

/// Build a result object: `{"status": ..., <payload fields>}`.
///
/// Non-object payloads are ignored.
pub fn tool_result(status: ToolStatus, payload: Value) -> Value {
    let mut object = Map::new();
    object.insert("status".to_string(), json!(status.as_str()));
    if let Value::Object(fields) = payload {
        for (key, value) in fields {
            if key != "status" {
                object.insert(key, value);
            }
        }
    }
    Value::Object(object)
}

/// One dispatched invocation as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRecord {
    pub name: String,
    pub arguments: Value,
    pub result: Value,
}

impl FunctionCallRecord {
    /// The `status` field of the result, if present.
    pub fn status(&self) -> Option<&str> {
        self.result.get("status").and_then(Value::as_str)
    }

    /// The serialized result handed back to the model.
    pub fn output(&self) -> String {
        self.result.to_string()
    }
}

/// Executes model-requested functions.
#[async_trait]
pub trait FunctionDispatcher: Send + Sync {
    /// Execute one call. Never fails: problems are reported in the
    /// record's `status`.
    async fn dispatch(&self, call: &ToolCall, sink: &dyn ProgressSink) -> FunctionCallRecord;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_merges_payload() {
        let result = tool_result(ToolStatus::Success, json!({"matched_books": []}));
        assert_eq!(result["status"], "success");
        assert_eq!(result["matched_books"], json!([]));
    }

    #[test]
    fn test_tool_result_status_wins() {
        let result = tool_result(ToolStatus::NotFound, json!({"status": "success", "book": null}));
        assert_eq!(result["status"], "not_found");
        assert!(result["book"].is_null());
    }

    #[test]
    fn test_record_status_and_output() {
        let record = FunctionCallRecord {
            name: "x".to_string(),
            arguments: json!({}),
            result: tool_result(ToolStatus::FunctionNotFound, Value::Null),
        };
        assert_eq!(record.status(), Some("function_not_found"));
        assert_eq!(record.output(), r#"{"status":"function_not_found"}"#);
    }
}
