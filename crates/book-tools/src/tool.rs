//! Tool trait definition and types.

use std::collections::HashMap;

use async_trait::async_trait;
use chat_core::{tool_result, ProgressSink, ToolStatus};
use serde_json::Value;

use crate::error::ToolError;
use crate::function::BookFunction;

/// Arguments passed to a tool for execution.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    /// Parameters as key-value pairs.
    pub params: HashMap<String, Value>,
}

impl ToolArgs {
    /// Create new tool arguments with the given parameters.
    pub fn new(params: HashMap<String, Value>) -> Self {
        Self { params }
    }

    /// Build arguments from a JSON value. Non-object values yield no params.
    pub fn from_value(value: &Value) -> Self {
        let params = value
            .as_object()
            .map(|object| object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self { params }
    }

    /// Get a string parameter, returning an error if missing or not a string.
    pub fn get_string(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))?
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ToolError::InvalidParameter {
                name: key.to_string(),
                reason: "expected string".to_string(),
            })
    }

    /// Get an optional string parameter.
    pub fn get_string_opt(&self, key: &str) -> Option<String> {
        self.params.get(key)?.as_str().map(|s| s.to_string())
    }
}

/// Output from a tool execution: a status plus function-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub status: ToolStatus,
    pub payload: Value,
}

impl ToolOutput {
    pub fn new(status: ToolStatus, payload: Value) -> Self {
        Self { status, payload }
    }

    /// Create a successful output.
    pub fn success(payload: Value) -> Self {
        Self::new(ToolStatus::Success, payload)
    }

    pub fn not_found(payload: Value) -> Self {
        Self::new(ToolStatus::NotFound, payload)
    }

    /// Create a failed output.
    pub fn failure(payload: Value) -> Self {
        Self::new(ToolStatus::Error, payload)
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// The merged result object handed back to the model.
    pub fn into_result(self) -> Value {
        tool_result(self.status, self.payload)
    }
}

/// A handler for one [`BookFunction`].
///
/// Handlers may report intermediate progress through the sink. Returning
/// an error is allowed; the dispatcher turns it into a `status: error`
/// result so the run keeps going.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The function this tool answers.
    fn function(&self) -> BookFunction;

    /// The tool's unique name (used for dispatch).
    fn name(&self) -> &'static str {
        self.function().name()
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs, sink: &dyn ProgressSink) -> Result<ToolOutput, ToolError>;
}
