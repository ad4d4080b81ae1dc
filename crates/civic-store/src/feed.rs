//! Live partition feeds shared by every store implementation

use crate::StoreError;
use civic_domain::traits::MessageFeed;
use civic_domain::{Message, Partition};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// Read access a feed needs from its backing store
pub(crate) trait SnapshotSource: Send + Sync {
    /// Current contents of a partition, ordered by `(created_at, id)`
    fn snapshot(&self, partition: &Partition) -> Result<Vec<Message>, StoreError>;

    /// Whether the store has been torn down
    fn is_closed(&self) -> bool;
}

/// Broadcasts which partition changed after each append
///
/// Closing drops the sender so every open receiver observes `Closed`.
pub(crate) struct ChangeNotifier {
    sender: Mutex<Option<broadcast::Sender<Partition>>>,
}

impl ChangeNotifier {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    pub(crate) fn receiver(&self) -> Result<broadcast::Receiver<Partition>, StoreError> {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|s| s.subscribe()).ok_or(StoreError::Closed)
    }

    pub(crate) fn notify(&self, partition: Partition) {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = guard.as_ref() {
            // No receivers is fine: nobody is watching this store right now
            let _ = sender.send(partition);
        }
    }

    pub(crate) fn close(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }
}

/// A live feed over one partition
///
/// The first [`next_snapshot`](MessageFeed::next_snapshot) yields the current
/// contents; each later call waits for an append to this partition and yields
/// the full ordered snapshot again. Appends to other partitions are ignored.
pub struct Subscription {
    partition: Partition,
    source: Arc<dyn SnapshotSource>,
    receiver: broadcast::Receiver<Partition>,
    pending: bool,
}

impl Subscription {
    pub(crate) fn new(
        partition: Partition,
        source: Arc<dyn SnapshotSource>,
        receiver: broadcast::Receiver<Partition>,
    ) -> Self {
        Self {
            partition,
            source,
            receiver,
            pending: true,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("partition", &self.partition)
            .field("pending", &self.pending)
            .finish()
    }
}

impl MessageFeed for Subscription {
    type Error = StoreError;

    fn partition(&self) -> &Partition {
        &self.partition
    }

    async fn next_snapshot(&mut self) -> Option<Result<Vec<Message>, StoreError>> {
        if self.source.is_closed() {
            return None;
        }

        if self.pending {
            self.pending = false;
            return Some(self.source.snapshot(&self.partition));
        }

        loop {
            match self.receiver.recv().await {
                Ok(changed) if changed == self.partition => {
                    return Some(self.source.snapshot(&self.partition));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // Missed notifications may include ours; re-read to stay current
                    debug!("Feed for {} lagged by {} notifications", self.partition, skipped);
                    return Some(self.source.snapshot(&self.partition));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn restart(&mut self) {
        self.pending = true;
    }
}
