use chrono::{Duration, Utc};
use depoauto_ops::adapters::dump::DumpTarget;
use depoauto_ops::app::jobs::backup::{BackupBucket, BACKUP_SUFFIX};
use depoauto_ops::app::jobs::{BackupJob, BackupOptions};
use depoauto_ops::core::paths::StorageLocation;
use depoauto_ops::core::{DumpTool, Job};
use depoauto_ops::{MemoryStorage, OpsError, Result};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Returns a canned dump and counts calls.
#[derive(Clone, Default)]
struct FakeDumper {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl DumpTool for FakeDumper {
    async fn dump(&self, _target: &DumpTarget) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OpsError::DumpFailed {
                message: "pg_dump exited with 1: connection refused".to_string(),
            });
        }
        Ok(b"BEGIN;\nCREATE TABLE products (id INTEGER);\nCOMMIT;\n".to_vec())
    }
}

fn sqlite_target() -> DumpTarget {
    DumpTarget::Sqlite {
        path: PathBuf::from("depoauto.db"),
    }
}

fn options(local_dir: PathBuf) -> BackupOptions {
    BackupOptions {
        local_dir,
        ..Default::default()
    }
}

fn unzip_single(archive: &[u8]) -> (String, String) {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    assert_eq!(zip.len(), 1);
    let mut entry = zip.by_index(0).unwrap();
    let name = entry.name().to_string();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    (name, text)
}

#[tokio::test]
async fn test_upload_to_bucket_and_prune_old_backups() {
    let dir = TempDir::new().unwrap();
    let bucket = MemoryStorage::new();
    let old = Utc::now() - Duration::days(45);
    let recent = Utc::now() - Duration::days(2);
    bucket.insert_at("db-backups/depoauto-20240101-000000.sql.zip", b"old", old).await;
    bucket.insert_at("db-backups/depoauto-20240301-000000.sql.zip", b"recent", recent).await;
    bucket.insert_at("db-backups/notes.txt", b"keep me", old).await;
    bucket.insert_at("elsewhere/depoauto-20240101-000000.sql.zip", b"other prefix", old).await;

    let dumper = FakeDumper::default();
    let job = BackupJob::new(dumper.clone(), sqlite_target(), options(dir.path().join("local")))
        .with_bucket(BackupBucket {
            store: bucket.clone(),
            location: StorageLocation::new("db-backups/"),
            label: "s3://depoauto-backups".to_string(),
        });
    let report = job.run().await.unwrap();

    assert_eq!(dumper.calls.load(Ordering::SeqCst), 1);
    assert!(!report.skipped);
    assert_eq!(report.pruned, 1);
    assert_eq!(report.destination.as_deref(), Some("s3://depoauto-backups"));

    let file_name = report.file_name.clone().unwrap();
    assert!(file_name.starts_with("depoauto-"));
    assert!(file_name.ends_with(BACKUP_SUFFIX));

    let keys = bucket.keys().await;
    assert!(!keys.contains(&"db-backups/depoauto-20240101-000000.sql.zip".to_string()));
    assert!(keys.contains(&"db-backups/depoauto-20240301-000000.sql.zip".to_string()));
    assert!(keys.contains(&"db-backups/notes.txt".to_string()));
    assert!(keys.contains(&"elsewhere/depoauto-20240101-000000.sql.zip".to_string()));

    let stored = bucket
        .get(&format!("db-backups/{}", file_name))
        .await
        .unwrap();
    assert_eq!(stored.options.content_type.as_deref(), Some("application/zip"));
    let (entry, text) = unzip_single(&stored.data);
    assert_eq!(entry, file_name.replace(BACKUP_SUFFIX, ".sql"));
    assert!(text.contains("CREATE TABLE products"));

    assert!(!dir.path().join("local").exists());
}

#[tokio::test]
async fn test_local_fallback_without_bucket() {
    let dir = TempDir::new().unwrap();
    let local_dir = dir.path().join("backups");
    std::fs::create_dir_all(&local_dir).unwrap();
    std::fs::write(local_dir.join("unrelated.sql.zip"), b"not ours").unwrap();

    let job: BackupJob<FakeDumper, MemoryStorage> =
        BackupJob::new(FakeDumper::default(), sqlite_target(), options(local_dir.clone()));
    let report = job.run().await.unwrap();

    let file_name = report.file_name.clone().unwrap();
    assert_eq!(report.destination, Some(local_dir.display().to_string()));
    assert_eq!(report.pruned, 0);

    let archive = std::fs::read(local_dir.join(&file_name)).unwrap();
    assert_eq!(archive.len(), report.archive_bytes);
    let (_, text) = unzip_single(&archive);
    assert!(text.starts_with("BEGIN;"));
    assert!(local_dir.join("unrelated.sql.zip").exists());
}

#[tokio::test]
async fn test_local_only_ignores_bucket() {
    let dir = TempDir::new().unwrap();
    let bucket = MemoryStorage::new();

    let mut opts = options(dir.path().to_path_buf());
    opts.local_only = true;
    opts.retention_days = 0;
    let report = BackupJob::new(FakeDumper::default(), sqlite_target(), opts)
        .with_bucket(BackupBucket {
            store: bucket.clone(),
            location: StorageLocation::default(),
            label: "s3://depoauto-backups".to_string(),
        })
        .run()
        .await
        .unwrap();

    assert!(bucket.keys().await.is_empty());
    assert!(dir.path().join(report.file_name.unwrap()).is_file());
}

#[tokio::test]
async fn test_unsupported_database_is_skipped() {
    let dir = TempDir::new().unwrap();
    let dumper = FakeDumper::default();
    let target = DumpTarget::from_database_url("mysql://root@db/depoauto").unwrap();

    let job: BackupJob<FakeDumper, MemoryStorage> =
        BackupJob::new(dumper.clone(), target, options(dir.path().join("b")));
    let report = job.run().await.unwrap();

    assert!(report.skipped);
    assert!(report.file_name.is_none());
    assert_eq!(dumper.calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("b").exists());
}

#[tokio::test]
async fn test_dump_failure_is_fatal_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let bucket = MemoryStorage::new();
    let dumper = FakeDumper {
        fail: true,
        ..Default::default()
    };

    let err = BackupJob::new(dumper, sqlite_target(), options(dir.path().join("b")))
        .with_bucket(BackupBucket {
            store: bucket.clone(),
            location: StorageLocation::default(),
            label: "s3://depoauto-backups".to_string(),
        })
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, OpsError::DumpFailed { .. }));
    assert!(bucket.keys().await.is_empty());
}
