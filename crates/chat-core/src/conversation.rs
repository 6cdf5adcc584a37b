//! Remote conversation service: threads, messages and assistant runs.
//!
//! A thread is a durable, server-side conversation. A run is one execution
//! of an assistant against a thread; it moves through [`RunStatus`] values
//! and may pause in `requires_action` while it waits for tool outputs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ServiceError;

/// Status of a remote assistant run as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Wire name of the status, e.g. `in_progress`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }

    /// Whether the run can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function call the model wants executed before the run can continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier the output must be submitted under.
    pub id: String,
    /// Function name as emitted by the model.
    pub name: String,
    /// Raw JSON arguments as emitted by the model.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Output for one [`ToolCall`], submitted back to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    /// Pending calls, in the order the model requested them.
    /// Only populated while `status` is `RequiresAction`.
    pub tool_calls: Vec<ToolCall>,
    /// Error detail reported by the service for failed runs.
    pub last_error: Option<String>,
}

impl RunSnapshot {
    pub fn new(id: impl Into<String>, thread_id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            status,
            tool_calls: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

/// Author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message stored on a remote thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    /// Text content segments in order. Non-text segments are dropped.
    pub text_segments: Vec<String>,
}

impl ThreadMessage {
    /// All text segments concatenated.
    pub fn text(&self) -> String {
        self.text_segments.concat()
    }
}

/// The remote conversation service that owns threads and runs.
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Create a new, empty thread and return its handle.
    async fn create_thread(&self) -> Result<String, ServiceError>;

    /// Append a user message to a thread. Returns the message id.
    async fn add_user_message(&self, thread_id: &str, content: &str)
        -> Result<String, ServiceError>;

    /// Start a run of `assistant_id` against the thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
        -> Result<RunSnapshot, ServiceError>;

    /// Fetch the current state of a run.
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ServiceError>;

    /// Submit outputs for every pending tool call of a run, as one batch.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolCallOutput>,
    ) -> Result<RunSnapshot, ServiceError>;

    /// Ask the service to cancel a run.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), ServiceError>;

    /// List thread messages, newest first.
    async fn list_messages(&self, thread_id: &str, limit: usize)
        -> Result<Vec<ThreadMessage>, ServiceError>;
}
