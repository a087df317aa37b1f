//! SQLite catalog store.
//!
//! - `migrations` - embedded schema migrations
//! - `queries` - free functions over a `&Connection`, grouped by table
//!
//! [`CatalogDb`] owns one connection behind a mutex. Callers take the
//! guard for a synchronous unit of work and drop it before awaiting.

pub mod migrations;
pub mod queries;

use crate::core::PathReferences;
use crate::utils::error::Result;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct CatalogDb {
    conn: Mutex<Connection>,
}

impl CatalogDb {
    /// Opens (or creates) the database file and brings the schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let applied = migrations::run_migrations(&conn)?;
        if applied > 0 {
            tracing::info!("🗄️ Catalog schema migrated ({} migration(s))", applied);
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks the connection. Never hold the guard across an `.await`.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        // 上一個持有者 panic 時連線本身仍可用
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` inside one transaction, committing only when it succeeds.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl PathReferences for CatalogDb {
    fn rewrite_path(&self, old_path: &str, new_path: &str) -> Result<usize> {
        self.with_transaction(|tx| queries::references::rewrite_path(tx, old_path, new_path))
    }

    fn count_references(&self, path: &str) -> Result<usize> {
        queries::references::count_references(&self.conn(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_runs_migrations_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/catalog.db");

        {
            let db = CatalogDb::open(&path).unwrap();
            queries::categories::get_or_create_category(&db.conn(), "Filtros").unwrap();
        }

        let db = CatalogDb::open(&path).unwrap();
        let version = migrations::current_version(&db.conn()).unwrap();
        assert_eq!(version, migrations::latest_version());
        assert!(queries::categories::get_category_by_name(&db.conn(), "Filtros")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = CatalogDb::open_in_memory().unwrap();
        let result: Result<()> = db.with_transaction(|tx| {
            queries::categories::get_or_create_category(tx, "Aceites")?;
            Err(crate::utils::error::OpsError::processing("boom"))
        });
        assert!(result.is_err());
        assert!(queries::categories::get_category_by_name(&db.conn(), "Aceites")
            .unwrap()
            .is_none());
    }
}
