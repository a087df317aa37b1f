use crate::adapters::storage::WebpStorage;
use crate::core::{Job, ObjectStore};
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub source: String,
    pub stored_name: String,
    pub converted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub files: Vec<UploadedFile>,
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let converted = self.files.iter().filter(|u| u.converted).count();
        write!(
            f,
            "{} file(s) stored, {} converted to WebP",
            self.files.len(),
            converted
        )
    }
}

/// Stores local files through the WebP adapter, under `dest_dir` when set.
pub struct UploadJob<S: ObjectStore> {
    storage: WebpStorage<S>,
    files: Vec<PathBuf>,
    dest_dir: Option<String>,
}

impl<S: ObjectStore> UploadJob<S> {
    pub fn new(storage: WebpStorage<S>, files: Vec<PathBuf>, dest_dir: Option<String>) -> Self {
        Self {
            storage,
            files,
            dest_dir,
        }
    }

    fn target_name(&self, file_name: &str) -> String {
        match self.dest_dir.as_deref().map(|d| d.trim_matches('/')) {
            Some(dir) if !dir.is_empty() => format!("{}/{}", dir, file_name),
            _ => file_name.to_string(),
        }
    }
}

#[async_trait]
impl<S: ObjectStore> Job for UploadJob<S> {
    type Report = UploadReport;

    fn name(&self) -> &'static str {
        "upload"
    }

    async fn run(&self) -> Result<UploadReport> {
        // 先確認所有檔案存在，避免上傳到一半才失敗
        if let Some(missing) = self.files.iter().find(|p| !p.is_file()) {
            return Err(OpsError::InputNotFound {
                path: missing.display().to_string(),
            });
        }

        let mut report = UploadReport::default();
        for path in &self.files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| OpsError::ValidationError {
                    message: format!("unusable file name: {}", path.display()),
                })?;

            let data = tokio::fs::read(path).await?;
            let requested = self.target_name(file_name);
            let stored_name = self.storage.save(&requested, &data).await?;

            tracing::info!("⬆️ {} -> {}", path.display(), stored_name);
            report.files.push(UploadedFile {
                source: path.display().to_string(),
                converted: stored_name != requested,
                stored_name,
            });
        }

        Ok(report)
    }
}
