//! Embedded schema migrations, applied in order and tracked in
//! `schema_migrations`.

use crate::utils::error::{OpsError, Result};
use rusqlite::Connection;

struct Migration {
    version: usize,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "catalog",
    sql: include_str!("001_catalog.sql"),
}];

fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<usize> {
    let version = conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<usize>>(0)
    })?;
    Ok(version.unwrap_or(0))
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let failed = |e: rusqlite::Error| OpsError::MigrationFailed {
        version: migration.version,
        message: e.to_string(),
    };

    conn.execute_batch(migration.sql).map_err(failed)?;
    conn.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.name],
    )
    .map_err(failed)?;

    Ok(())
}

/// Enables foreign keys and applies every pending migration, each in its
/// own transaction. Returns the number applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    init_migrations_table(conn)?;

    let current = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;
        apply_migration(&tx, migration)?;
        tx.commit().map_err(|e| OpsError::MigrationFailed {
            version: migration.version,
            message: e.to_string(),
        })?;

        applied += 1;
        tracing::debug!("🗄️ Applied migration {}: {}", migration.version, migration.name);
    }

    Ok(applied)
}

pub fn current_version(conn: &Connection) -> Result<usize> {
    init_migrations_table(conn)?;
    get_current_version(conn)
}

pub fn latest_version() -> usize {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_migrations() {
        let conn = Connection::open_in_memory().unwrap();

        let applied = run_migrations(&conn).unwrap();
        assert_eq!(applied, MIGRATIONS.len());
        assert_eq!(current_version(&conn).unwrap(), latest_version());

        // 第二次不應再套用
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn test_schema_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in [
            "categories",
            "products",
            "product_variants",
            "variant_images",
            "related_products",
            "site_config",
            "hero_slides",
            "schema_migrations",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }

    #[test]
    fn test_site_config_is_a_singleton() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM site_config", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert!(conn
            .execute("INSERT INTO site_config (id) VALUES (2)", [])
            .is_err());
    }
}
