use crate::error::StorageError;
use crate::ports::EndpointRegistry;
use crate::types::mayday::UserId;
use crate::types::push::{EndpointDescriptor, EndpointRecord};

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    records: Arc<RwLock<BTreeMap<UserId, EndpointDescriptor>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EndpointRegistry for MemoryRegistry {
    type UpsertFut<'a>
        = Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>
    where
        Self: 'a;
    type ListFut<'a>
        = Pin<Box<dyn Future<Output = Result<Vec<EndpointRecord>, StorageError>> + Send + 'a>>
    where
        Self: 'a;

    fn upsert<'a>(
        &'a self,
        user_id: &'a UserId,
        endpoint: &'a EndpointDescriptor,
    ) -> Self::UpsertFut<'a> {
        Box::pin(async move {
            self.records
                .write()
                .await
                .insert(user_id.clone(), endpoint.clone());
            Ok(())
        })
    }

    fn list_all<'a>(&'a self) -> Self::ListFut<'a> {
        Box::pin(async move {
            let records = self.records.read().await;
            Ok(records
                .iter()
                .map(|(user_id, endpoint)| EndpointRecord {
                    user_id: user_id.clone(),
                    endpoint: endpoint.clone(),
                })
                .collect())
        })
    }
}
