//! FunctionDispatcher implementation backed by ToolRegistry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chat_core::{
    tool_result, FunctionCallRecord, FunctionDispatcher, ProgressEvent, ProgressSink, ToolCall,
    ToolStatus,
};
use indexmap::IndexMap;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::function::BookFunction;
use crate::registry::ToolRegistry;
use crate::tool::{ToolArgs, ToolOutput};

/// Default maximum entries in the result cache before LRU eviction.
const DEFAULT_MAX_CACHE_ENTRIES: usize = 5000;

#[derive(Debug, Clone)]
pub struct ToolPolicy {
    pub timeout: Option<Duration>,
    pub cache_ttl: Option<Duration>,
    /// Maximum entries in the result cache before LRU eviction.
    pub max_cache_entries: usize,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            cache_ttl: None,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
        }
    }
}

impl ToolPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_max_cache_entries(mut self, max: usize) -> Self {
        self.max_cache_entries = max;
        self
    }
}

struct CacheEntry {
    inserted_at: Instant,
    result: Value,
}

/// Dispatches model-requested calls to the registry.
///
/// Every call produces a [`FunctionCallRecord`]: unknown names become
/// `function_not_found`, bad arguments, handler errors and timeouts become
/// `error` with the function's empty payload.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    policy: ToolPolicy,
    /// Result cache with LRU eviction (IndexMap preserves insertion order).
    cache: Mutex<IndexMap<String, CacheEntry>>,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_policy(registry, ToolPolicy::default())
    }

    pub fn with_policy(registry: ToolRegistry, policy: ToolPolicy) -> Self {
        Self::from_shared(Arc::new(registry), policy)
    }

    pub fn from_shared(registry: Arc<ToolRegistry>, policy: ToolPolicy) -> Self {
        Self {
            registry,
            policy,
            cache: Mutex::new(IndexMap::new()),
        }
    }

    /// Like [`ToolDispatcher::with_policy`], but refuses a registry with
    /// missing handlers.
    pub fn validated(registry: ToolRegistry, policy: ToolPolicy) -> Result<Self, ToolError> {
        registry.validate()?;
        Ok(Self::with_policy(registry, policy))
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.registry.as_ref()
    }

    pub fn policy(&self) -> &ToolPolicy {
        &self.policy
    }

    fn cache_key(function: BookFunction, args: &Value) -> String {
        // serde_json's default map is ordered, so equal arguments serialize equally.
        format!("{}|{}", function, args)
    }

    async fn try_cache(&self, function: BookFunction, args: &Value) -> Option<Value> {
        let ttl = self.policy.cache_ttl?;
        if !function.is_cacheable() {
            return None;
        }
        let key = Self::cache_key(function, args);
        let mut cache = self.cache.lock().await;

        // Move to end if exists (LRU behavior) and check expiry
        let entry = cache.shift_remove(&key)?;
        if entry.inserted_at.elapsed() > ttl {
            return None;
        }
        let result = entry.result.clone();
        cache.insert(key, entry);
        Some(result)
    }

    async fn store_cache(&self, function: BookFunction, args: &Value, output: &ToolOutput) {
        if self.policy.cache_ttl.is_none() || !function.is_cacheable() || !output.is_success() {
            return;
        }
        let key = Self::cache_key(function, args);
        let mut cache = self.cache.lock().await;

        cache.shift_remove(&key);
        cache.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                result: output.clone().into_result(),
            },
        );

        // LRU eviction: remove oldest entries if we exceed max
        while cache.len() > self.policy.max_cache_entries {
            cache.shift_remove_index(0);
        }
    }

    fn failure(function: BookFunction, message: impl Into<String>) -> Value {
        let mut payload = function.empty_payload();
        if let Value::Object(ref mut fields) = payload {
            fields.insert("message".to_string(), json!(message.into()));
        }
        tool_result(ToolStatus::Error, payload)
    }

    async fn run_tool(
        &self,
        function: BookFunction,
        arguments: &Value,
        sink: &dyn ProgressSink,
    ) -> Value {
        if let Some(cached) = self.try_cache(function, arguments).await {
            info!("Tool '{}' answered from cache", function);
            return cached;
        }

        let args = ToolArgs::from_value(arguments);
        let execute_future = self.registry.execute_function(function, args, sink);

        let outcome = match self.policy.timeout {
            Some(timeout_duration) => match timeout(timeout_duration, execute_future).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Tool '{}' timed out after {:?}", function, timeout_duration);
                    return Self::failure(function, "Tool execution timed out");
                }
            },
            None => execute_future.await,
        };

        match outcome {
            Ok(output) => {
                self.store_cache(function, arguments, &output).await;
                output.into_result()
            }
            Err(error) => {
                warn!("Tool '{}' failed: {}", function, error);
                Self::failure(function, error.to_string())
            }
        }
    }
}

#[async_trait]
impl FunctionDispatcher for ToolDispatcher {
    async fn dispatch(&self, call: &ToolCall, sink: &dyn ProgressSink) -> FunctionCallRecord {
        let parsed: Result<Value, _> = serde_json::from_str(&call.arguments);

        let Some(function) = BookFunction::from_name(&call.name) else {
            warn!("Model requested unknown function '{}'", call.name);
            return FunctionCallRecord {
                name: call.name.clone(),
                arguments: parsed.unwrap_or_else(|_| Value::String(call.arguments.clone())),
                result: tool_result(ToolStatus::FunctionNotFound, Value::Null),
            };
        };

        sink.emit(ProgressEvent::progress(
            format!("Processing {}...", function.progress_kind()),
            function.progress_kind(),
            function.icon(),
        ))
        .await;

        let (arguments, result) = match parsed {
            Ok(arguments) => {
                let result = self.run_tool(function, &arguments, sink).await;
                (arguments, result)
            }
            Err(error) => {
                warn!("Invalid arguments for '{}': {}", function, error);
                (
                    Value::String(call.arguments.clone()),
                    Self::failure(function, format!("Invalid arguments: {}", error)),
                )
            }
        };

        let record = FunctionCallRecord {
            name: call.name.clone(),
            arguments,
            result,
        };
        info!(
            "Dispatched '{}' -> {}",
            record.name,
            record.status().unwrap_or("unknown")
        );
        record
    }
}
