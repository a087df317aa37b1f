use crate::core::convert::{convert_upload, Conversion, SkipReason};
use crate::core::paths::{self, StorageLocation};
use crate::core::{ObjectStore, PutOptions};
use crate::utils::error::Result;

/// Upload front-end that re-encodes JPEG/PNG payloads to WebP before they
/// reach the wrapped store.
///
/// Names passed in and returned are backend-relative (`products/a.jpg`);
/// the configured location prefix is applied on the way to the store.
/// Conversion never fails an upload: when it does not apply, the original
/// bytes are stored under the original name.
#[derive(Debug, Clone)]
pub struct WebpStorage<S: ObjectStore> {
    inner: S,
    location: StorageLocation,
    cache_control: Option<String>,
}

impl<S: ObjectStore> WebpStorage<S> {
    pub fn new(inner: S, location: StorageLocation) -> Self {
        Self {
            inner,
            location,
            cache_control: Some(paths::IMAGE_CACHE_CONTROL.to_string()),
        }
    }

    pub fn with_cache_control(mut self, cache_control: Option<String>) -> Self {
        self.cache_control = cache_control;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Stores `data` under `name` (or its `.webp` twin) and returns the
    /// relative name actually used.
    pub async fn save(&self, name: &str, data: &[u8]) -> Result<String> {
        let (stored_name, payload, cache_control) = match convert_upload(name, data) {
            Conversion::Converted { key, image } => {
                tracing::debug!(
                    "🖼️ {} -> {} ({:?}, {} -> {} bytes)",
                    name,
                    key,
                    image.mode,
                    data.len(),
                    image.bytes.len()
                );
                (key, image.bytes, self.cache_control.clone())
            }
            Conversion::Passthrough { reason } => {
                if reason != SkipReason::NotConvertible {
                    tracing::warn!("⚠️ Storing {} unconverted: {}", name, reason);
                }
                (name.to_string(), data.to_vec(), None)
            }
        };

        let options = PutOptions {
            content_type: Some(paths::content_type_for(&stored_name).to_string()),
            cache_control,
        };
        self.inner
            .write_object(&self.location.full_key(&stored_name), &payload, &options)
            .await?;

        Ok(stored_name)
    }

    pub async fn open(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read_object(&self.location.full_key(name)).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.inner.delete_object(&self.location.full_key(name)).await
    }
}
