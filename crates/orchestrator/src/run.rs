//! Assistant run state machine.
//!
//! A run is started against a thread and then polled on a fixed interval.
//! When the service reports `requires_action`, every pending call is
//! dispatched in the order listed and all outputs go back as one batch.
//!
//! ```text
//! queued → in_progress ⇄ requires_action → completed
//!                                        → failed | cancelled | expired | incomplete
//! ```
//!
//! Polling is bounded by a deadline and a [`CancellationToken`]. Either one
//! abandons the run with a best-effort remote cancel; the deadline reports
//! `expired`, the token reports `cancelled`.

use std::sync::Arc;
use std::time::Duration;

use chat_core::{
    ConversationService, FunctionCallRecord, FunctionDispatcher, ProgressEvent, ProgressSink,
    RunSnapshot, RunStatus, ToolCallOutput,
};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;

/// A run that reached `completed`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    /// Every dispatched call in request order, across all action rounds.
    pub function_results: Vec<FunctionCallRecord>,
}

/// Drives assistant runs to a terminal status.
#[derive(Clone)]
pub struct RunDriver {
    conversation: Arc<dyn ConversationService>,
    dispatcher: Arc<dyn FunctionDispatcher>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl RunDriver {
    pub fn new(
        conversation: Arc<dyn ConversationService>,
        dispatcher: Arc<dyn FunctionDispatcher>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            conversation,
            dispatcher,
            poll_interval,
            max_wait,
        }
    }

    pub fn conversation(&self) -> &Arc<dyn ConversationService> {
        &self.conversation
    }

    /// Start a run of `assistant_id` on a thread that already holds the user message.
    pub async fn start(&self, thread_id: &str, assistant_id: &str) -> Result<RunSnapshot, OrchestratorError> {
        let run = self.conversation.create_run(thread_id, assistant_id).await?;
        info!("Started run {} on thread {} ({})", run.id, thread_id, run.status);
        Ok(run)
    }

    /// Poll a started run until it reaches a terminal status.
    ///
    /// Emits `Assistant status: <status>` once per poll. Returns the
    /// collected function results on `completed` and
    /// [`OrchestratorError::RunFailed`] for any other terminal status.
    pub async fn drive(
        &self,
        run: &RunSnapshot,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, OrchestratorError> {
        let thread_id = run.thread_id.as_str();
        let run_id = run.id.as_str();
        let deadline = Instant::now() + self.max_wait;
        let mut function_results = Vec::new();

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.abandon(thread_id, run_id, RunStatus::Cancelled).await);
                }
                _ = sleep_until(deadline) => {
                    return Err(self.abandon(thread_id, run_id, RunStatus::Expired).await);
                }
                result = self.conversation.get_run(thread_id, run_id) => result?,
            };

            debug!("Run {} status: {}", run_id, snapshot.status);
            sink.emit(ProgressEvent::status(format!(
                "Assistant status: {}",
                snapshot.status
            )))
            .await;

            match snapshot.status {
                RunStatus::Completed => {
                    info!(
                        "Run {} completed with {} function calls",
                        run_id,
                        function_results.len()
                    );
                    return Ok(RunOutcome {
                        run_id: run_id.to_string(),
                        function_results,
                    });
                }
                RunStatus::RequiresAction => {
                    let records = self.submit_tool_outputs(&snapshot, sink).await?;
                    function_results.extend(records);
                }
                status if status.is_terminal() => {
                    warn!(
                        "Run {} ended with status {}: {}",
                        run_id,
                        status,
                        snapshot.last_error.as_deref().unwrap_or("no error details")
                    );
                    return Err(OrchestratorError::RunFailed { status });
                }
                _ => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.abandon(thread_id, run_id, RunStatus::Cancelled).await);
                }
                _ = sleep_until(deadline) => {
                    return Err(self.abandon(thread_id, run_id, RunStatus::Expired).await);
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Start a run and drive it to completion.
    pub async fn execute(
        &self,
        thread_id: &str,
        assistant_id: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, OrchestratorError> {
        let run = self.start(thread_id, assistant_id).await?;
        self.drive(&run, sink, cancel).await
    }

    /// Dispatch every pending call in order and submit all outputs together.
    async fn submit_tool_outputs(
        &self,
        snapshot: &RunSnapshot,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<FunctionCallRecord>, OrchestratorError> {
        sink.emit(ProgressEvent::status("Executing function calls...")).await;

        let mut records = Vec::with_capacity(snapshot.tool_calls.len());
        let mut outputs = Vec::with_capacity(snapshot.tool_calls.len());

        for call in &snapshot.tool_calls {
            sink.emit(ProgressEvent::status(format!("Calling function: {}", call.name)))
                .await;

            let record = self.dispatcher.dispatch(call, sink).await;
            outputs.push(ToolCallOutput {
                tool_call_id: call.id.clone(),
                output: record.output(),
            });
            records.push(record);
        }

        info!(
            "Submitting {} tool outputs for run {}",
            outputs.len(),
            snapshot.id
        );
        self.conversation
            .submit_tool_outputs(&snapshot.thread_id, &snapshot.id, outputs)
            .await?;

        Ok(records)
    }

    /// Best-effort remote cancel, then report the synthetic terminal status.
    async fn abandon(&self, thread_id: &str, run_id: &str, status: RunStatus) -> OrchestratorError {
        warn!("Abandoning run {} as {}", run_id, status);
        if let Err(e) = self.conversation.cancel_run(thread_id, run_id).await {
            warn!("Failed to cancel run {}: {}", run_id, e);
        }
        OrchestratorError::RunFailed { status }
    }
}
