use crate::error::StorageError;
use crate::types::mayday::UserId;
use crate::types::push::{EndpointDescriptor, EndpointRecord};

/// Key-value store of one push endpoint per user.
pub trait EndpointRegistry: Clone + Send + Sync + 'static {
    type UpsertFut<'a>: Future<Output = Result<(), StorageError>> + Send + 'a
    where
        Self: 'a;
    type ListFut<'a>: Future<Output = Result<Vec<EndpointRecord>, StorageError>> + Send + 'a
    where
        Self: 'a;

    /// Inserts or overwrites the record for `user_id`. Last write wins.
    fn upsert<'a>(
        &'a self,
        user_id: &'a UserId,
        endpoint: &'a EndpointDescriptor,
    ) -> Self::UpsertFut<'a>;

    fn list_all<'a>(&'a self) -> Self::ListFut<'a>;
}
