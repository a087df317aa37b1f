pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
pub mod webp;

pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
pub use webp::WebpStorage;

use crate::core::paths::StorageLocation;
use crate::core::{ObjectInfo, ObjectStore, PutOptions};
use crate::utils::error::Result;

/// Store selected at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    Local(LocalStorage),
    #[cfg(feature = "s3")]
    S3(S3Storage),
}

impl ObjectStore for ConfiguredStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        match self {
            ConfiguredStore::Local(store) => store.list_objects(prefix).await,
            #[cfg(feature = "s3")]
            ConfiguredStore::S3(store) => store.list_objects(prefix).await,
        }
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        match self {
            ConfiguredStore::Local(store) => store.read_object(key).await,
            #[cfg(feature = "s3")]
            ConfiguredStore::S3(store) => store.read_object(key).await,
        }
    }

    async fn write_object(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        match self {
            ConfiguredStore::Local(store) => store.write_object(key, data, options).await,
            #[cfg(feature = "s3")]
            ConfiguredStore::S3(store) => store.write_object(key, data, options).await,
        }
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        match self {
            ConfiguredStore::Local(store) => store.delete_object(key).await,
            #[cfg(feature = "s3")]
            ConfiguredStore::S3(store) => store.delete_object(key).await,
        }
    }
}

/// Turns stored relative paths into public URLs.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base_url: String,
    location: StorageLocation,
}

impl MediaUrls {
    pub fn new(base_url: &str, location: StorageLocation) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            location,
        }
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, self.location.full_key(relative))
    }

    /// An uploaded file wins over an external URL; `None` when neither is set.
    pub fn display_url(&self, file: Option<&str>, external_url: &str) -> Option<String> {
        match file.filter(|f| !f.is_empty()) {
            Some(file) => Some(self.url(file)),
            None if !external_url.is_empty() => Some(external_url.to_string()),
            None => None,
        }
    }
}
