use crate::core::{ObjectInfo, ObjectStore, PutOptions};
use crate::utils::error::{OpsError, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Filesystem-backed object store. Keys map to paths under `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        // 不允許跳出根目錄
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(OpsError::storage(format!("Invalid object key: {}", key)));
        }
        Ok(self.base_path.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }
}

impl ObjectStore for LocalStorage {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&self.base_path).sort_by_file_name() {
            let entry = entry.map_err(|e| OpsError::storage(format!("Failed to walk: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(key) = self.key_for(entry.path()) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| OpsError::storage(e.to_string()))?;
            let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            objects.push(ObjectInfo {
                key,
                size: metadata.len(),
                last_modified,
            });
        }

        Ok(objects)
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(key)?;
        match fs::read(&full_path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OpsError::ObjectNotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_object(&self, key: &str, data: &[u8], _options: &PutOptions) -> Result<()> {
        let full_path = self.resolve(key)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let full_path = self.resolve(key)?;
        match fs::remove_file(&full_path) {
            Ok(()) => Ok(()),
            // 與 S3 行為一致：刪除不存在的物件視為成功
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
