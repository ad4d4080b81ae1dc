//! In-process session store

use crate::feed::{ChangeNotifier, SnapshotSource, Subscription};
use crate::{StoreError, DEFAULT_FEED_CAPACITY};
use civic_domain::traits::SessionStore;
use civic_domain::{Message, MessageId, Partition};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// In-memory implementation of [`SessionStore`]
///
/// Partitions are kept sorted on insert, so writes that arrive out of
/// creation order still read back in `(created_at, id)` order.
///
/// Cloning the store yields another handle to the same partitions.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    partitions: RwLock<HashMap<Partition, Vec<Message>>>,
    ids: RwLock<HashSet<MessageId>>,
    notifier: ChangeNotifier,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_feed_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create an empty store with a custom change-channel capacity
    pub fn with_feed_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                partitions: RwLock::new(HashMap::new()),
                ids: RwLock::new(HashSet::new()),
                notifier: ChangeNotifier::new(capacity),
            }),
        }
    }

    /// Total number of messages across all partitions
    pub fn len(&self) -> usize {
        self.inner
            .partitions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether the store holds no messages
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Partitions that hold at least one message
    pub fn partitions(&self) -> Vec<Partition> {
        self.inner
            .partitions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryInner {
    fn insert(&self, message: Message) -> Result<MessageId, StoreError> {
        if self.notifier.is_closed() {
            return Err(StoreError::Closed);
        }

        crate::check_created_at(message.created_at)?;

        let id = message.id;
        if !self.ids.write().unwrap_or_else(|e| e.into_inner()).insert(id) {
            return Err(StoreError::Duplicate(id));
        }

        let partition = message.partition();
        {
            let mut partitions = self.partitions.write().unwrap_or_else(|e| e.into_inner());
            let messages = partitions.entry(partition.clone()).or_default();
            let key = message.ordering_key();
            let position = messages.partition_point(|m| m.ordering_key() <= key);
            messages.insert(position, message);
        }

        debug!("Appended message {} to {}", id, partition);
        self.notifier.notify(partition);
        Ok(id)
    }
}

impl SnapshotSource for MemoryInner {
    fn snapshot(&self, partition: &Partition) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .partitions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(partition)
            .cloned()
            .unwrap_or_default())
    }

    fn is_closed(&self) -> bool {
        self.notifier.is_closed()
    }
}

impl SessionStore for MemoryStore {
    type Error = StoreError;
    type Feed = Subscription;

    async fn append(&self, message: Message) -> Result<MessageId, StoreError> {
        self.inner.insert(message)
    }

    async fn history(&self, partition: &Partition) -> Result<Vec<Message>, StoreError> {
        if self.inner.is_closed() {
            return Err(StoreError::Closed);
        }
        self.inner.snapshot(partition)
    }

    fn subscribe(&self, partition: Partition) -> Result<Subscription, StoreError> {
        let receiver = self.inner.notifier.receiver()?;
        let source: Arc<dyn SnapshotSource> = self.inner.clone();
        Ok(Subscription::new(partition, source, receiver))
    }

    fn close(&self) {
        debug!("Closing in-memory store");
        self.inner.notifier.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_domain::{Department, SessionId};

    fn partition() -> Partition {
        Partition::new(Department::Vehicle, SessionId::new("s1").unwrap())
    }

    #[test]
    fn test_insert_keeps_creation_order() {
        let store = MemoryStore::new();
        let p = partition();

        store.inner.insert(Message::user("third", &p, 30)).unwrap();
        store.inner.insert(Message::user("first", &p, 10)).unwrap();
        store.inner.insert(Message::user("second", &p, 20)).unwrap();

        let contents: Vec<_> = store
            .inner
            .snapshot(&p)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_rejected() {
        let store = MemoryStore::new();
        let message = Message::user("hi", &partition(), 1);

        store.inner.insert(message.clone()).unwrap();
        assert!(matches!(
            store.inner.insert(message),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn test_clone_shares_partitions() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.inner.insert(Message::user("hi", &partition(), 1)).unwrap();
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.partitions(), vec![partition()]);
    }
}
