//! In-process `maydays` table: an append-only event log plus a broadcast of
//! every insert to live subscribers. Subscribers only see rows inserted
//! after they subscribed.

use crate::error::StorageError;
use crate::ports::{MaydayStore, MaydaySubscription, TimeProvider};
use crate::types::mayday::{DistressEvent, NewMayday};

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct MaydayFeed<T> {
    time: T,
    events: Arc<Mutex<Vec<DistressEvent>>>,
    tx: broadcast::Sender<DistressEvent>,
}

impl<T: TimeProvider> MaydayFeed<T> {
    pub fn new(time: T, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            time,
            events: Arc::new(Mutex::new(Vec::new())),
            tx,
        }
    }

    pub fn events(&self) -> Result<Vec<DistressEvent>, StorageError> {
        let events = self
            .events
            .lock()
            .map_err(|_| StorageError::Unavailable("mayday log lock poisoned".to_string()))?;
        Ok(events.clone())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn append(&self, mayday: NewMayday) -> Result<DistressEvent, StorageError> {
        mayday
            .coordinate()
            .validate()
            .map_err(|err| StorageError::Rejected(err.to_string()))?;
        if mayday.owner_id.as_str().trim().is_empty() {
            return Err(StorageError::Rejected("users_id is required".to_string()));
        }

        let event = {
            let mut events = self
                .events
                .lock()
                .map_err(|_| StorageError::Unavailable("mayday log lock poisoned".to_string()))?;
            let event = DistressEvent {
                id: events.len() as u64 + 1,
                owner_id: mayday.owner_id,
                latitude: mayday.latitude,
                longitude: mayday.longitude,
                created_at: self.time.now(),
            };
            events.push(event.clone());
            event
        };

        // No receivers is fine; the row is stored either way.
        let _ = self.tx.send(event.clone());
        tracing::debug!(id = event.id, owner = %event.owner_id, "mayday inserted");
        Ok(event)
    }
}

impl<T: TimeProvider> MaydayStore for MaydayFeed<T> {
    type InsertFut<'a>
        = std::future::Ready<Result<DistressEvent, StorageError>>
    where
        Self: 'a;

    fn insert<'a>(&'a self, mayday: NewMayday) -> Self::InsertFut<'a> {
        std::future::ready(self.append(mayday))
    }

    fn subscribe(&self) -> MaydaySubscription {
        MaydaySubscription::new(self.tx.subscribe())
    }
}
