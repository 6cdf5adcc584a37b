//! Delayed wrapper - adds artificial latency to another conversation service.

use std::time::Duration;

use async_trait::async_trait;
use chat_core::{ConversationService, RunSnapshot, ServiceError, ThreadMessage, ToolCallOutput};
use tokio::time::sleep;

/// Wraps a conversation service and sleeps before every call.
///
/// Useful for testing deadlines, cancellation and overlapping requests.
pub struct DelayedConversation<C: ConversationService> {
    inner: C,
    delay: Duration,
}

impl<C: ConversationService> DelayedConversation<C> {
    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create a wrapper with a delay in milliseconds.
    pub fn with_millis(inner: C, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ConversationService> ConversationService for DelayedConversation<C> {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        sleep(self.delay).await;
        self.inner.create_thread().await
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<String, ServiceError> {
        sleep(self.delay).await;
        self.inner.add_user_message(thread_id, content).await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunSnapshot, ServiceError> {
        sleep(self.delay).await;
        self.inner.create_run(thread_id, assistant_id).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ServiceError> {
        sleep(self.delay).await;
        self.inner.get_run(thread_id, run_id).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolCallOutput>,
    ) -> Result<RunSnapshot, ServiceError> {
        sleep(self.delay).await;
        self.inner.submit_tool_outputs(thread_id, run_id, outputs).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), ServiceError> {
        self.inner.cancel_run(thread_id, run_id).await
    }

    async fn list_messages(&self, thread_id: &str, limit: usize) -> Result<Vec<ThreadMessage>, ServiceError> {
        sleep(self.delay).await;
        self.inner.list_messages(thread_id, limit).await
    }
}
