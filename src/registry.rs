//! Endpoint registry adapters: one push endpoint per user, last write wins.
//!
//! Concurrent registrations for the same user from several devices leave
//! only the last writer's endpoint in place.

mod file;
mod memory;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

use crate::error::StorageError;
use crate::ports::EndpointRegistry;
use crate::types::mayday::UserId;
use crate::types::push::{EndpointDescriptor, EndpointRecord};

use std::future::Future;
use std::pin::Pin;

/// Registry selected at startup.
#[derive(Clone)]
pub enum Registry {
    Memory(MemoryRegistry),
    File(FileRegistry),
}

impl EndpointRegistry for Registry {
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
        match self {
            Registry::Memory(registry) => registry.upsert(user_id, endpoint),
            Registry::File(registry) => registry.upsert(user_id, endpoint),
        }
    }

    fn list_all<'a>(&'a self) -> Self::ListFut<'a> {
        match self {
            Registry::Memory(registry) => registry.list_all(),
            Registry::File(registry) => registry.list_all(),
        }
    }
}
