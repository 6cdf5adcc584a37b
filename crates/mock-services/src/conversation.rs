//! Scripted in-memory conversation service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chat_core::{
    ConversationService, MessageRole, RunSnapshot, RunStatus, ServiceError, ThreadMessage,
    ToolCall, ToolCallOutput,
};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// One scripted step of a run, consumed by successive `get_run` calls.
#[derive(Debug, Clone)]
pub enum RunStep {
    /// Report a non-terminal status.
    Status(RunStatus),
    /// Ask for tool outputs. The run stays here until they are submitted.
    RequiresAction(Vec<ToolCall>),
    /// Append an assistant message and complete.
    Complete(String),
    /// End in a terminal failure status.
    Fail(RunStatus),
}

struct MockRun {
    snapshot: RunSnapshot,
    steps: VecDeque<RunStep>,
}

#[derive(Default)]
struct State {
    threads: HashMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, MockRun>,
    scripts: VecDeque<Vec<RunStep>>,
    submissions: Vec<(String, Vec<ToolCallOutput>)>,
    cancelled: Vec<String>,
    get_run_calls: usize,
}

/// A [`ConversationService`] that plays back scripted runs.
///
/// Each `create_run` takes the next queued script (see
/// [`ScriptedConversation::push_script`]); with no script queued the run
/// completes immediately with the default reply. A script that runs out of
/// steps without a terminal step leaves the run in its last status forever,
/// which is handy for timeout tests.
pub struct ScriptedConversation {
    state: Mutex<State>,
    default_reply: String,
    ids: AtomicUsize,
    thread_delay: Option<Duration>,
    fail_messages: bool,
}

impl Default for ScriptedConversation {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConversation {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            default_reply: "Hello! What would you like to read today?".to_string(),
            ids: AtomicUsize::new(0),
            thread_delay: None,
            fail_messages: false,
        }
    }

    /// Reply used by runs without a script.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Delay thread creation, to widen race windows in tests.
    pub fn with_thread_delay(mut self, delay: Duration) -> Self {
        self.thread_delay = Some(delay);
        self
    }

    /// Make `list_messages` fail.
    pub fn with_failing_messages(mut self) -> Self {
        self.fail_messages = true;
        self
    }

    /// Queue the script for the next run.
    pub async fn push_script(&self, steps: Vec<RunStep>) {
        self.state.lock().await.scripts.push_back(steps);
    }

    /// Number of threads created so far.
    pub async fn thread_count(&self) -> usize {
        self.state.lock().await.threads.len()
    }

    /// Number of runs started so far.
    pub async fn run_count(&self) -> usize {
        self.state.lock().await.runs.len()
    }

    /// Messages on a thread, oldest first.
    pub async fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.state
            .lock()
            .await
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every tool output batch submitted, as `(run_id, outputs)`.
    pub async fn submissions(&self) -> Vec<(String, Vec<ToolCallOutput>)> {
        self.state.lock().await.submissions.clone()
    }

    /// Runs that were cancelled.
    pub async fn cancelled_runs(&self) -> Vec<String> {
        self.state.lock().await.cancelled.clone()
    }

    /// Total number of `get_run` polls.
    pub async fn poll_count(&self) -> usize {
        self.state.lock().await.get_run_calls
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn push_message(state: &mut State, thread_id: &str, message: ThreadMessage) -> Result<(), ServiceError> {
        state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| ServiceError::NotFound(format!("thread {}", thread_id)))?
            .push(message);
        Ok(())
    }
}

#[async_trait]
impl ConversationService for ScriptedConversation {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        if let Some(delay) = self.thread_delay {
            sleep(delay).await;
        }
        let id = self.next_id("thread");
        self.state.lock().await.threads.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<String, ServiceError> {
        let id = self.next_id("msg");
        let mut state = self.state.lock().await;
        Self::push_message(
            &mut state,
            thread_id,
            ThreadMessage {
                id: id.clone(),
                role: MessageRole::User,
                text_segments: vec![content.to_string()],
            },
        )?;
        Ok(id)
    }

    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> Result<RunSnapshot, ServiceError> {
        let id = self.next_id("run");
        let mut state = self.state.lock().await;
        if !state.threads.contains_key(thread_id) {
            return Err(ServiceError::NotFound(format!("thread {}", thread_id)));
        }
        let steps = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| vec![RunStep::Complete(self.default_reply.clone())]);
        let snapshot = RunSnapshot::new(id.clone(), thread_id, RunStatus::Queued);
        state.runs.insert(
            id,
            MockRun {
                snapshot: snapshot.clone(),
                steps: steps.into(),
            },
        );
        Ok(snapshot)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, ServiceError> {
        let reply_id = self.next_id("msg");
        let mut state = self.state.lock().await;
        state.get_run_calls += 1;

        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ServiceError::NotFound(format!("run {}", run_id)))?;

        if run.snapshot.status == RunStatus::RequiresAction || run.snapshot.status.is_terminal() {
            return Ok(run.snapshot.clone());
        }

        let Some(step) = run.steps.pop_front() else {
            return Ok(run.snapshot.clone());
        };

        let mut reply = None;
        match step {
            RunStep::Status(status) => {
                run.snapshot.status = status;
                run.snapshot.tool_calls.clear();
            }
            RunStep::RequiresAction(calls) => {
                run.snapshot.status = RunStatus::RequiresAction;
                run.snapshot.tool_calls = calls;
            }
            RunStep::Complete(text) => {
                run.snapshot.status = RunStatus::Completed;
                run.snapshot.tool_calls.clear();
                reply = Some(text);
            }
            RunStep::Fail(status) => {
                run.snapshot.status = status;
                run.snapshot.tool_calls.clear();
                run.snapshot.last_error = Some("scripted failure".to_string());
            }
        }
        let snapshot = run.snapshot.clone();

        if let Some(text) = reply {
            Self::push_message(
                &mut state,
                thread_id,
                ThreadMessage {
                    id: reply_id,
                    role: MessageRole::Assistant,
                    text_segments: vec![text],
                },
            )?;
        }
        Ok(snapshot)
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolCallOutput>,
    ) -> Result<RunSnapshot, ServiceError> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ServiceError::NotFound(format!("run {}", run_id)))?;

        if run.snapshot.status != RunStatus::RequiresAction {
            return Err(ServiceError::api(400, "Run is not waiting for tool outputs"));
        }

        let expected: Vec<&str> = run.snapshot.tool_calls.iter().map(|c| c.id.as_str()).collect();
        let submitted: Vec<&str> = outputs.iter().map(|o| o.tool_call_id.as_str()).collect();
        if expected != submitted {
            return Err(ServiceError::api(
                400,
                format!("Expected outputs for {:?}, got {:?}", expected, submitted),
            ));
        }

        run.snapshot.status = RunStatus::InProgress;
        run.snapshot.tool_calls.clear();
        let snapshot = run.snapshot.clone();
        state.submissions.push((run_id.to_string(), outputs));
        Ok(snapshot)
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ServiceError::NotFound(format!("run {}", run_id)))?;
        if !run.snapshot.status.is_terminal() {
            run.snapshot.status = RunStatus::Cancelled;
            run.snapshot.tool_calls.clear();
        }
        state.cancelled.push(run_id.to_string());
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str, limit: usize) -> Result<Vec<ThreadMessage>, ServiceError> {
        if self.fail_messages {
            return Err(ServiceError::Network("message listing unavailable".to_string()));
        }
        let state = self.state.lock().await;
        let messages = state
            .threads
            .get(thread_id)
            .ok_or_else(|| ServiceError::NotFound(format!("thread {}", thread_id)))?;
        Ok(messages.iter().rev().take(limit).cloned().collect())
    }
}
