//! Columns that hold backend-relative storage paths of uploaded images.

use crate::utils::error::Result;
use rusqlite::Connection;

/// Every `(table, column)` pair that stores an image path.
pub const IMAGE_FIELDS: &[(&str, &str)] = &[
    ("categories", "image_file"),
    ("products", "image_file"),
    ("variant_images", "image_file"),
    ("site_config", "hero_image_1_file"),
    ("site_config", "hero_image_2_file"),
    ("site_config", "hero_image_3_file"),
    ("hero_slides", "image_file"),
];

/// Repoints every tracked column equal to `old_path`. Run it inside a
/// transaction so a partial rewrite is never committed.
pub fn rewrite_path(conn: &Connection, old_path: &str, new_path: &str) -> Result<usize> {
    let mut updated = 0;
    for (table, column) in IMAGE_FIELDS {
        let sql = format!("UPDATE {table} SET {column} = ?2 WHERE {column} = ?1");
        let changed = conn.execute(&sql, [old_path, new_path])?;
        if changed > 0 {
            tracing::debug!("📝 {}.{}: {} row(s) {} -> {}", table, column, changed, old_path, new_path);
        }
        updated += changed;
    }
    Ok(updated)
}

pub fn count_references(conn: &Connection, path: &str) -> Result<usize> {
    let mut total = 0;
    for (table, column) in IMAGE_FIELDS {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1");
        let count: i64 = conn.query_row(&sql, [path], |row| row.get(0))?;
        total += count as usize;
    }
    Ok(total)
}
