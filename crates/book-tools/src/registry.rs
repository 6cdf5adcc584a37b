//! Tool registry for managing and executing book tools.

use std::collections::HashMap;
use std::sync::Arc;

use chat_core::ProgressSink;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::function::BookFunction;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Registry for managing tools.
///
/// Holds one handler per [`BookFunction`] and dispatches execution requests
/// by function name.
pub struct ToolRegistry {
    tools: HashMap<BookFunction, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// If a tool for the same function already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_shared(Arc::new(tool));
    }

    /// Register a shared tool.
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        info!("Registering tool: {}", tool.name());
        self.tools.insert(tool.function(), tool);
    }

    /// Registered function names, sorted by declaration order.
    pub fn list_tools(&self) -> Vec<&'static str> {
        let mut functions: Vec<BookFunction> = self.tools.keys().copied().collect();
        functions.sort();
        functions.into_iter().map(|f| f.name()).collect()
    }

    pub fn get(&self, function: BookFunction) -> Option<&Arc<dyn Tool>> {
        self.tools.get(&function)
    }

    /// Check if a tool is registered.
    pub fn has_tool(&self, name: &str) -> bool {
        BookFunction::from_name(name).is_some_and(|f| self.tools.contains_key(&f))
    }

    /// Fail if any known function lacks a handler.
    pub fn validate(&self) -> Result<(), ToolError> {
        for function in BookFunction::ALL {
            if !self.tools.contains_key(&function) {
                return Err(ToolError::Unregistered(function.name().to_string()));
            }
        }
        Ok(())
    }

    /// Execute a tool by function.
    pub async fn execute_function(
        &self,
        function: BookFunction,
        args: ToolArgs,
        sink: &dyn ProgressSink,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(&function)
            .ok_or_else(|| ToolError::Unregistered(function.name().to_string()))?;

        debug!("Executing tool '{}' with {} params", function, args.params.len());

        let result = tool.execute(args, sink).await?;

        debug!("Tool '{}' completed: status={}", function, result.status.as_str());

        Ok(result)
    }

    /// Execute a tool by name with the given parameters.
    pub async fn execute(
        &self,
        name: &str,
        params: HashMap<String, Value>,
        sink: &dyn ProgressSink,
    ) -> Result<ToolOutput, ToolError> {
        let function =
            BookFunction::from_name(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        self.execute_function(function, ToolArgs::new(params), sink).await
    }

    /// Execute a tool with JSON arguments string.
    pub async fn execute_json(
        &self,
        name: &str,
        args_json: &str,
        sink: &dyn ProgressSink,
    ) -> Result<ToolOutput, ToolError> {
        let params: HashMap<String, Value> = serde_json::from_str(args_json)?;
        self.execute(name, params, sink).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
