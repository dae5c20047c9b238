use crate::error::StorageError;
use crate::ports::EndpointRegistry;
use crate::types::mayday::UserId;
use crate::types::push::{EndpointDescriptor, EndpointRecord};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry persisted as a TOML document:
///
/// ```toml
/// [endpoints]
/// "user-id" = '{"endpoint":"https://...","keys":{...}}'
/// ```
///
/// Each descriptor is kept as the JSON text it arrived as.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    endpoints: BTreeMap<String, String>,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_document(&self) -> Result<RegistryDocument, StorageError> {
        let contents = match tokio::fs::read_to_string(self.path.as_path()).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(RegistryDocument::default());
            }
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&contents).map_err(|err| {
            StorageError::Corrupt(format!("{}: {err}", self.path.display()))
        })
    }

    async fn write_document(&self, document: &RegistryDocument) -> Result<(), StorageError> {
        let contents =
            toml::to_string(document).map_err(|err| StorageError::Rejected(err.to_string()))?;
        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, self.path.as_path()).await?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl EndpointRegistry for FileRegistry {
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
            let _guard = self.write_lock.lock().await;
            let mut document = self.read_document().await?;
            document
                .endpoints
                .insert(user_id.as_str().to_string(), endpoint.to_json());
            self.write_document(&document).await
        })
    }

    fn list_all<'a>(&'a self) -> Self::ListFut<'a> {
        Box::pin(async move {
            let document = self.read_document().await?;
            document
                .endpoints
                .into_iter()
                .map(|(user_id, raw)| {
                    let endpoint = EndpointDescriptor::from_json(&raw).map_err(|err| {
                        StorageError::Corrupt(format!("endpoint for '{user_id}': {err}"))
                    })?;
                    Ok(EndpointRecord {
                        user_id: UserId::new(user_id),
                        endpoint,
                    })
                })
                .collect()
        })
    }
}
