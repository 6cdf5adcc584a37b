//! Intermediate progress reporting.
//!
//! Long-running steps (run polling, tool handlers) report what they are doing
//! through a [`ProgressSink`]. Emission is fire-and-forget: a sink that can no
//! longer deliver (for example because the client went away) drops events
//! silently and the work carries on.

use async_trait::async_trait;
use serde::Serialize;

/// A progress marker attached to a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressMarker {
    #[serde(rename = "type")]
    pub kind: String,
    pub icon: String,
}

/// An intermediate event produced while a request is being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Human-readable status line.
    Status(String),
    /// Typed progress for a tool invocation.
    Progress {
        status: String,
        marker: ProgressMarker,
    },
}

impl ProgressEvent {
    pub fn status(text: impl Into<String>) -> Self {
        ProgressEvent::Status(text.into())
    }

    pub fn progress(status: impl Into<String>, kind: impl Into<String>, icon: impl Into<String>) -> Self {
        ProgressEvent::Progress {
            status: status.into(),
            marker: ProgressMarker {
                kind: kind.into(),
                icon: icon.into(),
            },
        }
    }
}

/// Receives progress events.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

/// A sink that discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoOpSink;

#[async_trait]
impl ProgressSink for NoOpSink {
    async fn emit(&self, _event: ProgressEvent) {}
}

/// A sink that logs every event at debug level.
#[derive(Debug, Clone, Default)]
pub struct LoggingSink;

#[async_trait]
impl ProgressSink for LoggingSink {
    async fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Status(text) => tracing::debug!("[status] {}", text),
            ProgressEvent::Progress { status, marker } => {
                tracing::debug!("[progress] {} {} ({})", marker.icon, status, marker.kind)
            }
        }
    }
}
