use crate::error::StorageError;
use crate::types::mayday::{DistressEvent, NewMayday};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Append-only distress table with an INSERT stream.
pub trait MaydayStore: Clone + Send + Sync + 'static {
    type InsertFut<'a>: Future<Output = Result<DistressEvent, StorageError>> + Send + 'a
    where
        Self: 'a;

    fn insert<'a>(&'a self, mayday: NewMayday) -> Self::InsertFut<'a>;
    fn subscribe(&self) -> MaydaySubscription;
}

/// Receiving side of the INSERT stream. Dropping it releases the channel.
pub struct MaydaySubscription {
    receiver: broadcast::Receiver<DistressEvent>,
}

impl MaydaySubscription {
    pub fn new(receiver: broadcast::Receiver<DistressEvent>) -> Self {
        Self { receiver }
    }

    /// Next inserted row, or `None` once the source is closed. Rows dropped
    /// because this subscriber fell behind are skipped.
    pub async fn next(&mut self) -> Option<DistressEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "mayday subscription lagged; events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
