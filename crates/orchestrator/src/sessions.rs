//! Session-to-thread registry.
//!
//! Maps an opaque session id to the remote thread holding its conversation.
//! Thread creation happens at most once per session even under concurrent
//! first requests: each session owns a `OnceCell` and only the map lookup is
//! done under the registry lock, never the remote call.
//!
//! Entries are evicted after `ttl` of inactivity or, past `max_entries`,
//! least recently used first. Sessions with a run in flight are never evicted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chat_core::ConversationService;
use indexmap::IndexMap;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::OrchestratorError;

#[derive(Default)]
struct SessionSlot {
    thread: OnceCell<String>,
    busy: AtomicBool,
}

struct SessionEntry {
    slot: Arc<SessionSlot>,
    last_used: Instant,
}

/// Key-scoped store of session threads.
pub struct SessionRegistry {
    conversation: Arc<dyn ConversationService>,
    ttl: Duration,
    max_entries: usize,
    /// Ordered least to most recently used.
    entries: Mutex<IndexMap<String, SessionEntry>>,
}

/// Marks a session as having a run in flight. Released on drop.
pub struct RunGuard {
    session_id: String,
    thread_id: String,
    slot: Arc<SessionSlot>,
}

impl RunGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// Clears the busy flag if thread resolution fails before a guard exists.
struct BusyReset<'a>(Option<&'a SessionSlot>);

impl Drop for BusyReset<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.0 {
            slot.busy.store(false, Ordering::Release);
        }
    }
}

impl SessionRegistry {
    pub fn new(conversation: Arc<dyn ConversationService>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            conversation,
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Return the session's thread, creating it on first use.
    pub async fn resolve_thread(&self, session_id: &str) -> Result<String, OrchestratorError> {
        let slot = self.touch(session_id).await;
        self.thread_for(session_id, &slot).await
    }

    /// Claim the session for one run and resolve its thread.
    ///
    /// Fails with [`OrchestratorError::SessionBusy`] while another run holds
    /// the session.
    pub async fn begin_run(&self, session_id: &str) -> Result<RunGuard, OrchestratorError> {
        let slot = self.touch(session_id).await;

        if slot
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OrchestratorError::SessionBusy(session_id.to_string()));
        }

        let mut reset = BusyReset(Some(slot.as_ref()));
        let thread_id = self.thread_for(session_id, &slot).await?;
        reset.0 = None;

        Ok(RunGuard {
            session_id: session_id.to_string(),
            thread_id,
            slot: slot.clone(),
        })
    }

    /// The session's thread if one exists, without creating or touching it.
    pub async fn peek_thread(&self, session_id: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        entries
            .get(session_id)
            .filter(|entry| entry.last_used.elapsed() < self.ttl)
            .and_then(|entry| entry.slot.thread.get().cloned())
    }

    /// Number of tracked sessions.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look up or create the slot, mark it most recently used and evict.
    async fn touch(&self, session_id: &str) -> Arc<SessionSlot> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let before = entries.len();
        entries.retain(|_, entry| {
            entry.slot.busy.load(Ordering::Acquire) || now.duration_since(entry.last_used) < self.ttl
        });
        if entries.len() < before {
            debug!("Evicted {} idle sessions", before - entries.len());
        }

        let slot = entries
            .shift_remove(session_id)
            .map(|entry| entry.slot)
            .unwrap_or_default();
        entries.insert(
            session_id.to_string(),
            SessionEntry {
                slot: slot.clone(),
                last_used: now,
            },
        );

        while entries.len() > self.max_entries {
            let victim = entries
                .iter()
                .position(|(key, entry)| key != session_id && !entry.slot.busy.load(Ordering::Acquire));
            match victim {
                Some(index) => {
                    entries.shift_remove_index(index);
                }
                None => break,
            }
        }

        slot
    }

    async fn thread_for(&self, session_id: &str, slot: &SessionSlot) -> Result<String, OrchestratorError> {
        let thread = slot
            .thread
            .get_or_try_init(|| async {
                let thread = self.conversation.create_thread().await?;
                info!("Created thread {} for session {}", thread, session_id);
                Ok::<_, OrchestratorError>(thread)
            })
            .await?;
        Ok(thread.clone())
    }
}
