//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Implementations live in other crates.

use crate::{Department, Message, MessageId, Partition, Response};
use std::future::Future;

/// Trait for producing a response to free-text input
///
/// Implemented by the application layer (civic-assistant).
/// Must always succeed: when nothing matches, a fallback response is returned.
pub trait Responder {
    /// Select the response for `input` under the given department context
    fn respond(&self, input: &str, department: Department) -> Response;
}

/// Trait for the persisted conversation log
///
/// Implemented by the infrastructure layer (civic-store).
/// One store handle is constructed at startup and shared by every caller.
pub trait SessionStore: Send + Sync {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Live feed returned by [`SessionStore::subscribe`]
    type Feed: MessageFeed<Error = Self::Error>;

    /// Append a message to its partition
    fn append(
        &self,
        message: Message,
    ) -> impl Future<Output = Result<MessageId, Self::Error>> + Send;

    /// Read a partition ordered by `(created_at, id)`
    fn history(
        &self,
        partition: &Partition,
    ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send;

    /// Open a live feed over one partition
    fn subscribe(&self, partition: Partition) -> Result<Self::Feed, Self::Error>;

    /// Tear down the store; open feeds end and further calls fail
    fn close(&self);
}

/// A cancellable, restartable sequence of partition snapshots
///
/// Lifecycle: subscribe, then deliver (`next_snapshot`), then unsubscribe
/// (drop or [`MessageFeed::unsubscribe`]).
pub trait MessageFeed: Send {
    /// Error type for snapshot reads
    type Error;

    /// Partition this feed observes
    fn partition(&self) -> &Partition;

    /// Wait for the next ordered snapshot
    ///
    /// The first call yields the current contents. Returns `None` once the
    /// store is closed.
    fn next_snapshot(
        &mut self,
    ) -> impl Future<Output = Option<Result<Vec<Message>, Self::Error>>> + Send;

    /// Re-deliver the current contents on the next call to `next_snapshot`
    fn restart(&mut self);

    /// End the feed
    fn unsubscribe(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}
