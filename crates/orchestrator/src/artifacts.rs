//! Audio artifact store.
//!
//! Synthesized speech is held in memory under a content-addressed filename
//! (`<sha256 prefix>.mp3`) and served by reference. Entries expire after a
//! TTL and the store is capped, oldest first. A background task purges
//! expired entries until its shutdown token fires.

use std::sync::Arc;
use std::time::Duration;

use chat_core::hash_bytes;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Hex characters of the content hash used in filenames.
const NAME_HASH_CHARS: usize = 32;

struct StoredArtifact {
    bytes: Arc<Vec<u8>>,
    stored_at: Instant,
}

/// In-memory, TTL-bounded store of synthesized audio.
pub struct ArtifactStore {
    ttl: Duration,
    max_entries: usize,
    url_prefix: String,
    /// Ordered oldest to newest registration.
    entries: Mutex<IndexMap<String, StoredArtifact>>,
}

impl ArtifactStore {
    pub fn new(ttl: Duration, max_entries: usize, url_prefix: impl Into<String>) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            url_prefix: url_prefix.into(),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Store audio and return its filename.
    ///
    /// Identical audio maps to the same filename; registering it again
    /// refreshes its expiry.
    pub async fn register(&self, bytes: Vec<u8>) -> String {
        let digest = hash_bytes(&bytes);
        let filename = format!("{}.mp3", &digest[..NAME_HASH_CHARS]);

        let mut entries = self.entries.lock().await;
        entries.shift_remove(&filename);
        entries.insert(
            filename.clone(),
            StoredArtifact {
                bytes: Arc::new(bytes),
                stored_at: Instant::now(),
            },
        );
        while entries.len() > self.max_entries {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                debug!("Evicted audio artifact {} (capacity)", evicted);
            }
        }

        debug!("Registered audio artifact {}", filename);
        filename
    }

    /// Public URL for a filename.
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}{}", self.url_prefix, filename)
    }

    /// Audio bytes for a filename, if present and not expired.
    pub async fn get(&self, filename: &str) -> Option<Arc<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        let expired = entries.get(filename)?.stored_at.elapsed() >= self.ttl;
        if expired {
            entries.shift_remove(filename);
            return None;
        }
        entries.get(filename).map(|artifact| artifact.bytes.clone())
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, artifact| artifact.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        info!("Cleared {} audio artifacts", count);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn the periodic purge task. It stops when `shutdown` is cancelled.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.purge_expired().await;
                        if removed > 0 {
                            info!("Purged {} expired audio artifacts", removed);
                        }
                    }
                }
            }
            debug!("Audio cleanup task stopped");
        })
    }
}
