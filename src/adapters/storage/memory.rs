use crate::core::{ObjectInfo, ObjectStore, PutOptions};
use crate::utils::error::{OpsError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub options: PutOptions,
    pub last_modified: DateTime<Utc>,
}

/// In-process object store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object with an explicit modification time.
    pub async fn insert_at(&self, key: &str, data: &[u8], last_modified: DateTime<Utc>) {
        let mut objects = self.objects.lock().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                options: PutOptions::default(),
                last_modified,
            },
        );
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

impl ObjectStore for MemoryStorage {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let objects = self.objects.lock().await;
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.lock().await;
        objects
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| OpsError::ObjectNotFound {
                key: key.to_string(),
            })
    }

    async fn write_object(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        let mut objects = self.objects.lock().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                options: options.clone(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.objects.lock().await.remove(key);
        Ok(())
    }
}
