//! One-off migration of stored JPEG/PNG objects to WebP.
//!
//! Objects are handled one at a time: download, convert, upload the
//! `.webp` twin, repoint database references, then delete the original.
//! A failure on one object is logged and counted and the pass moves on.

use crate::core::convert::{self, SkipReason};
use crate::core::paths::{self, StorageLocation};
use crate::core::{Job, ObjectStore, PathReferences, PutOptions};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub scanned: usize,
    pub converted: usize,
    pub references_updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} converted, {} references updated, {} originals deleted, {} skipped, {} errors",
            self.scanned,
            self.converted,
            self.references_updated,
            self.deleted,
            self.skipped,
            self.errors
        )
    }
}

enum ObjectOutcome {
    Migrated { references: usize },
    Skipped(SkipReason),
}

pub struct MigrateImagesJob<S: ObjectStore, R: PathReferences> {
    store: S,
    references: Arc<R>,
    location: StorageLocation,
    delete_originals: bool,
}

impl<S: ObjectStore, R: PathReferences> MigrateImagesJob<S, R> {
    pub fn new(store: S, references: Arc<R>, location: StorageLocation) -> Self {
        Self {
            store,
            references,
            location,
            delete_originals: true,
        }
    }

    /// `false` keeps the original objects (`--no-delete`).
    pub fn delete_originals(mut self, delete: bool) -> Self {
        self.delete_originals = delete;
        self
    }

    async fn migrate_object(&self, key: &str, webp_key: &str) -> Result<ObjectOutcome> {
        let raw = self.store.read_object(key).await?;

        let image = match convert::convert_image(&raw) {
            Ok(image) => image,
            Err(reason) => return Ok(ObjectOutcome::Skipped(reason)),
        };

        let options = PutOptions::with_content_type(paths::content_type_for(webp_key))
            .cache_control(paths::IMAGE_CACHE_CONTROL);
        self.store
            .write_object(webp_key, &image.bytes, &options)
            .await?;

        // 資料庫存的是不含 location 前綴的相對路徑
        let old_path = self.location.relative_path(key);
        let new_path = self.location.relative_path(webp_key);
        let references = self.references.rewrite_path(old_path, new_path)?;

        if references > 0 {
            tracing::info!(
                "  ✅ {} -> {} ({:?}, {} reference(s) updated)",
                key,
                webp_key,
                image.mode,
                references
            );
        } else {
            tracing::info!("  ✅ {} -> {} (no references)", key, webp_key);
        }

        Ok(ObjectOutcome::Migrated { references })
    }
}

#[async_trait]
impl<S: ObjectStore, R: PathReferences> Job for MigrateImagesJob<S, R> {
    type Report = MigrationReport;

    fn name(&self) -> &'static str {
        "migrate-images"
    }

    async fn run(&self) -> Result<MigrationReport> {
        let prefix = self.location.prefix();
        tracing::info!("📋 Listing objects under '{}'", prefix);
        if self.delete_originals {
            tracing::info!("Originals will be deleted after conversion");
        } else {
            tracing::info!("--no-delete: originals are kept");
        }

        let objects = self.store.list_objects(prefix).await?;
        let mut report = MigrationReport::default();

        for object in objects {
            report.scanned += 1;
            let key = object.key;
            if !paths::is_convertible(&key) {
                continue;
            }

            let webp_key = paths::swap_extension(&key);
            if webp_key == key {
                report.skipped += 1;
                continue;
            }

            match self.migrate_object(&key, &webp_key).await {
                Ok(ObjectOutcome::Migrated { references }) => {
                    report.converted += 1;
                    report.references_updated += references;

                    // 轉檔與資料庫都已完成才刪原檔；刪除失敗只算一筆錯誤
                    if self.delete_originals {
                        match self.store.delete_object(&key).await {
                            Ok(()) => {
                                tracing::debug!("  🗑️ Deleted original {}", key);
                                report.deleted += 1;
                            }
                            Err(e) => {
                                tracing::warn!("  ❌ Could not delete original {}: {}", key, e);
                                report.errors += 1;
                            }
                        }
                    }
                }
                Ok(ObjectOutcome::Skipped(reason)) => {
                    tracing::warn!("  ⚠️ Could not convert {}: {}", key, reason);
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("  ❌ {} failed: {}", key, e);
                    report.errors += 1;
                }
            }
        }

        Ok(report)
    }
}
