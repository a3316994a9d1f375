use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::{CacheKey, DataCache};
use crate::error::GatewayResult;
use crate::gateway::MovieListGateway;
use crate::models::UserMovie;

#[derive(Debug, Default)]
struct Entry {
    records: Option<Vec<UserMovie>>,
    stale: bool,
    /// Bumped by invalidation and cancellation; a refetch only lands if it still matches
    generation: u64,
}

/// Message for a background refetch
struct RefetchMessage {
    key: CacheKey,
    generation: u64,
}

/// In-process reactive cache of user movie collections
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<CacheKey, Entry>>>,
    refetch_tx: Option<mpsc::UnboundedSender<RefetchMessage>>,
}

/// Handle for gracefully shutting down the refetch worker
///
/// Dropping the handle also stops the worker.
pub struct RefetchWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefetchWorkerHandle {
    /// Signals the worker to stop and waits for it to process queued refetches
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Refetch worker shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Refetch worker join error");
        }
    }
}

impl QueryCache {
    /// Creates a cache with no refetch worker; invalidation only marks keys stale
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache whose invalidated keys are refetched from `gateway` in the background
    pub fn with_refetch(gateway: Arc<dyn MovieListGateway>) -> (Self, RefetchWorkerHandle) {
        let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let entries: Arc<Mutex<HashMap<CacheKey, Entry>>> = Arc::default();

        let worker_entries = Arc::clone(&entries);
        let task = tokio::spawn(async move {
            Self::refetch_worker_task(worker_entries, gateway, refetch_rx, shutdown_rx).await;
        });

        let cache = Self {
            entries,
            refetch_tx: Some(refetch_tx),
        };

        (cache, RefetchWorkerHandle { shutdown_tx, task })
    }

    /// Whether the key was invalidated and not yet refetched
    pub fn is_stale(&self, key: CacheKey) -> bool {
        self.entries.lock().get(&key).is_some_and(|e| e.stale)
    }

    /// Background task that processes refetch messages
    ///
    /// On shutdown it drains whatever is already queued before exiting.
    async fn refetch_worker_task(
        entries: Arc<Mutex<HashMap<CacheKey, Entry>>>,
        gateway: Arc<dyn MovieListGateway>,
        mut refetch_rx: mpsc::UnboundedReceiver<RefetchMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Refetch worker task started");

        loop {
            tokio::select! {
                Some(msg) = refetch_rx.recv() => {
                    Self::refetch(&entries, gateway.as_ref(), msg).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Refetch worker shutting down, flushing queued refetches");

                    while let Ok(msg) = refetch_rx.try_recv() {
                        Self::refetch(&entries, gateway.as_ref(), msg).await;
                    }

                    tracing::info!("Refetch worker task stopped");
                    break;
                }
            }
        }
    }

    async fn refetch(
        entries: &Mutex<HashMap<CacheKey, Entry>>,
        gateway: &dyn MovieListGateway,
        msg: RefetchMessage,
    ) {
        let fetched: GatewayResult<Vec<UserMovie>> = match msg.key {
            CacheKey::Watchlist => gateway.list_source().await,
            CacheKey::Watched => gateway.list_target().await,
        };

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(key = %msg.key, error = %e, "Failed to refetch cached collection");
                return;
            }
        };

        let mut entries = entries.lock();
        let entry = entries.entry(msg.key).or_default();

        if entry.generation != msg.generation {
            tracing::debug!(
                key = %msg.key,
                requested = msg.generation,
                current = entry.generation,
                "Discarding superseded refetch"
            );
            return;
        }

        tracing::debug!(key = %msg.key, count = records.len(), "Refetched cached collection");
        entry.records = Some(records);
        entry.stale = false;
    }
}

impl DataCache for QueryCache {
    fn read(&self, key: CacheKey) -> Option<Vec<UserMovie>> {
        self.entries.lock().get(&key).and_then(|e| e.records.clone())
    }

    fn write(&self, key: CacheKey, records: Vec<UserMovie>) {
        self.entries.lock().entry(key).or_default().records = Some(records);
    }

    fn invalidate(&self, key: CacheKey) {
        let generation = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key).or_default();
            entry.stale = true;
            entry.generation += 1;
            entry.generation
        };

        let Some(tx) = &self.refetch_tx else {
            return;
        };

        if let Err(e) = tx.send(RefetchMessage { key, generation }) {
            tracing::error!(key = %key, error = %e, "Failed to send refetch message");
        }
    }

    fn cancel_in_flight(&self, key: CacheKey) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&key) {
            entry.generation += 1;
        }
    }
}
