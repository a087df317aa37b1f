//! Database backup: dump, zip, store, prune.
//!
//! The archive goes to the backup bucket when one is configured, otherwise
//! to a local directory. Retention pruning runs against whichever
//! destination received the new archive and only considers files named
//! like our own backups.

use crate::adapters::dump::DumpTarget;
use crate::adapters::storage::LocalStorage;
use crate::core::paths::StorageLocation;
use crate::core::{DumpTool, Job, ObjectStore, PutOptions};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

pub const BACKUP_SUFFIX: &str = ".sql.zip";

#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Never upload, even when a bucket is configured.
    pub local_only: bool,
    /// Archives older than this many days are pruned; 0 disables pruning.
    pub retention_days: u32,
    pub file_prefix: String,
    pub local_dir: PathBuf,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            local_only: false,
            retention_days: 30,
            file_prefix: "depoauto".to_string(),
            local_dir: PathBuf::from("backups"),
        }
    }
}

/// Remote destination for archives.
#[derive(Debug, Clone)]
pub struct BackupBucket<S: ObjectStore> {
    pub store: S,
    pub location: StorageLocation,
    /// Human readable name used in logs and the report (`s3://bucket`).
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    pub skipped: bool,
    pub file_name: Option<String>,
    pub destination: Option<String>,
    pub dump_bytes: usize,
    pub archive_bytes: usize,
    pub pruned: usize,
}

impl fmt::Display for BackupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "nothing backed up");
        }
        write!(
            f,
            "{} ({:.1} KB) stored in {}, {} old backup(s) pruned",
            self.file_name.as_deref().unwrap_or("-"),
            self.archive_bytes as f64 / 1024.0,
            self.destination.as_deref().unwrap_or("-"),
            self.pruned
        )
    }
}

/// `<prefix>-YYYYmmdd-HHMMSS`, in UTC.
pub fn backup_stem(file_prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", file_prefix, at.format("%Y%m%d-%H%M%S"))
}

pub fn is_backup_file_name(name: &str, file_prefix: &str) -> bool {
    !name.contains('/')
        && name.starts_with(&format!("{}-", file_prefix))
        && name.ends_with(BACKUP_SUFFIX)
}

/// Deflated zip archive holding the dump as a single `.sql` entry.
pub fn compress_dump(entry_name: &str, dump: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(dump.len() as u64 >= u32::MAX as u64);

    zip.start_file::<_, ()>(entry_name, options)?;
    zip.write_all(dump)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Deletes our own archives older than `cutoff`, never `keep`. Single
/// deletion failures are logged and skipped.
async fn prune_backups<T: ObjectStore>(
    store: &T,
    location: &StorageLocation,
    file_prefix: &str,
    keep: &str,
    cutoff: DateTime<Utc>,
) -> Result<usize> {
    let mut pruned = 0;
    for object in store.list_objects(location.prefix()).await? {
        if object.key == keep {
            continue;
        }
        if !is_backup_file_name(location.relative_path(&object.key), file_prefix) {
            continue;
        }
        let Some(modified) = object.last_modified else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }

        match store.delete_object(&object.key).await {
            Ok(()) => {
                tracing::info!("  🗑️ Pruned old backup {}", object.key);
                pruned += 1;
            }
            Err(e) => tracing::warn!("⚠️ Could not prune {}: {}", object.key, e),
        }
    }
    Ok(pruned)
}

pub struct BackupJob<D: DumpTool, S: ObjectStore> {
    dumper: D,
    target: DumpTarget,
    bucket: Option<BackupBucket<S>>,
    options: BackupOptions,
}

impl<D: DumpTool, S: ObjectStore> BackupJob<D, S> {
    pub fn new(dumper: D, target: DumpTarget, options: BackupOptions) -> Self {
        Self {
            dumper,
            target,
            bucket: None,
            options,
        }
    }

    pub fn with_bucket(mut self, bucket: BackupBucket<S>) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Writes the archive and prunes the same destination.
    async fn deliver<T: ObjectStore>(
        &self,
        store: &T,
        location: &StorageLocation,
        file_name: &str,
        archive: &[u8],
    ) -> Result<usize> {
        let key = location.full_key(file_name);
        store
            .write_object(&key, archive, &PutOptions::with_content_type("application/zip"))
            .await?;

        if self.options.retention_days == 0 {
            return Ok(0);
        }

        tracing::info!(
            "🧹 Pruning backups older than {} day(s)",
            self.options.retention_days
        );
        let cutoff = Utc::now() - chrono::Duration::days(self.options.retention_days as i64);
        match prune_backups(store, location, &self.options.file_prefix, &key, cutoff).await {
            Ok(pruned) => Ok(pruned),
            Err(e) => {
                tracing::warn!("⚠️ Pruning old backups failed: {}", e);
                Ok(0)
            }
        }
    }
}

#[async_trait]
impl<D: DumpTool, S: ObjectStore> Job for BackupJob<D, S> {
    type Report = BackupReport;

    fn name(&self) -> &'static str {
        "backup"
    }

    async fn run(&self) -> Result<BackupReport> {
        if let DumpTarget::Unsupported { scheme } = &self.target {
            tracing::warn!(
                "⚠️ Only PostgreSQL and SQLite databases can be backed up ('{}' given); nothing to do",
                scheme
            );
            return Ok(BackupReport {
                skipped: true,
                ..Default::default()
            });
        }

        tracing::info!("💾 Dumping {}", self.target.describe());
        let dump = self.dumper.dump(&self.target).await?;

        let stem = backup_stem(&self.options.file_prefix, Utc::now());
        let file_name = format!("{}{}", stem, BACKUP_SUFFIX);
        let archive = compress_dump(&format!("{}.sql", stem), &dump)?;
        tracing::info!("  Dump compressed: {:.1} KB", archive.len() as f64 / 1024.0);

        let mut report = BackupReport {
            skipped: false,
            file_name: Some(file_name.clone()),
            destination: None,
            dump_bytes: dump.len(),
            archive_bytes: archive.len(),
            pruned: 0,
        };

        match (&self.bucket, self.options.local_only) {
            (Some(bucket), false) => {
                tracing::info!("⬆️ Uploading to {}/{}", bucket.label, bucket.location.full_key(&file_name));
                report.pruned = self
                    .deliver(&bucket.store, &bucket.location, &file_name, &archive)
                    .await?;
                report.destination = Some(bucket.label.clone());
            }
            (bucket, local_only) => {
                if bucket.is_none() && !local_only {
                    tracing::warn!(
                        "⚠️ No backup bucket configured; saving locally in {}",
                        self.options.local_dir.display()
                    );
                }
                let local = LocalStorage::new(&self.options.local_dir);
                report.pruned = self
                    .deliver(&local, &StorageLocation::default(), &file_name, &archive)
                    .await?;
                report.destination = Some(self.options.local_dir.display().to_string());
            }
        }

        Ok(report)
    }
}
