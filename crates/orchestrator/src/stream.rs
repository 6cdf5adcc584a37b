//! Streaming progress events.
//!
//! A streamed chat turn produces `status` and `progress` events followed by
//! exactly one terminal `complete` or `error`. Events are pushed through a
//! bounded channel by a single producer task. A consumer that goes away only
//! stops delivery; the producer keeps working to the end of the run.

use async_trait::async_trait;
use chat_core::{ProgressEvent, ProgressMarker, ProgressSink};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::finalizer::Reply;

/// Events buffered before the producer waits for the consumer.
pub const EVENT_BUFFER: usize = 64;

/// One event of a streamed chat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status(String),
    Progress {
        status: String,
        marker: ProgressMarker,
    },
    Complete(Box<Reply>),
    Error(String),
}

impl StreamEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Status(_) => "status",
            StreamEvent::Progress { .. } => "progress",
            StreamEvent::Complete(_) => "complete",
            StreamEvent::Error(_) => "error",
        }
    }

    /// JSON payload of the event.
    pub fn data(&self) -> Value {
        match self {
            StreamEvent::Status(status) => json!({ "status": status }),
            StreamEvent::Progress { status, marker } => json!({
                "status": status,
                "progress": marker,
            }),
            StreamEvent::Complete(reply) => json!(reply),
            StreamEvent::Error(error) => json!({ "error": error }),
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete(_) | StreamEvent::Error(_))
    }

    /// Render as a server-sent event frame.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data())
    }
}

impl From<ProgressEvent> for StreamEvent {
    fn from(event: ProgressEvent) -> Self {
        match event {
            ProgressEvent::Status(status) => StreamEvent::Status(status),
            ProgressEvent::Progress { status, marker } => StreamEvent::Progress { status, marker },
        }
    }
}

/// A [`ProgressSink`] that forwards into a stream channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self::new(tx), rx)
    }

    /// Send any event, including terminal ones.
    ///
    /// Returns `false` once the consumer is gone.
    pub async fn send(&self, event: StreamEvent) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!("Stream consumer gone, dropping {} event", event.name());
                false
            }
        }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&self, event: ProgressEvent) {
        self.send(event.into()).await;
    }
}
