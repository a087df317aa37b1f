use crate::core::slug::{slugify, unique_slug};
use crate::domain::model::Category;
use crate::utils::error::Result;
use rusqlite::{Connection, OptionalExtension};

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, image_url, image_file, is_active, created_at, updated_at";

fn parse_category_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        image_url: row.get(4)?,
        image_file: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS);
    Ok(conn.query_row(&sql, [id], parse_category_row).optional()?)
}

pub fn get_category_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
    let sql = format!("SELECT {} FROM categories WHERE name = ?1", CATEGORY_COLUMNS);
    Ok(conn.query_row(&sql, [name], parse_category_row).optional()?)
}

/// Active category by slug.
pub fn get_category_by_slug(conn: &Connection, slug: &str) -> Result<Option<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE slug = ?1 AND is_active = 1",
        CATEGORY_COLUMNS
    );
    Ok(conn.query_row(&sql, [slug], parse_category_row).optional()?)
}

/// Returns the category named `name`, creating it when missing.
/// The flag is `true` when a row was inserted.
pub fn get_or_create_category(conn: &Connection, name: &str) -> Result<(Category, bool)> {
    if let Some(existing) = get_category_by_name(conn, name)? {
        return Ok((existing, false));
    }

    let base = Some(slugify(name))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "category".to_string());
    let slug = unique_slug(&base, |candidate| {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = ?1)",
            [candidate],
            |row| row.get(0),
        )?;
        Ok(taken)
    })?;

    conn.execute(
        "INSERT INTO categories (name, slug) VALUES (?1, ?2)",
        rusqlite::params![name, slug],
    )?;
    let id = conn.last_insert_rowid();

    let category = get_category(conn, id)?.ok_or_else(|| crate::utils::error::OpsError::NotFound {
        entity: "Category".to_string(),
        key: id.to_string(),
    })?;
    Ok((category, true))
}

/// Active categories ordered by name, optionally capped.
pub fn list_active_categories(conn: &Connection, limit: Option<usize>) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE is_active = 1 ORDER BY name LIMIT ?1",
        CATEGORY_COLUMNS
    );
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(&sql)?;
    let categories = stmt
        .query_map([limit], parse_category_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn set_category_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE categories SET is_active = ?2, updated_at = datetime('now') WHERE id = ?1",
        rusqlite::params![id, active],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CatalogDb;

    #[test]
    fn test_get_or_create_category() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();

        let (created, was_created) = get_or_create_category(&conn, "Filtros de Aceite").unwrap();
        assert!(was_created);
        assert_eq!(created.slug, "filtros-de-aceite");
        assert!(created.is_active);

        let (again, was_created) = get_or_create_category(&conn, "Filtros de Aceite").unwrap();
        assert!(!was_created);
        assert_eq!(again.id, created.id);
    }

    #[test]
    fn test_colliding_slugs_get_suffixes() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();

        let (a, _) = get_or_create_category(&conn, "Frenos").unwrap();
        let (b, _) = get_or_create_category(&conn, "frenos").unwrap();
        let (c, _) = get_or_create_category(&conn, "!!!").unwrap();
        assert_eq!(a.slug, "frenos");
        assert_eq!(b.slug, "frenos-2");
        assert_eq!(c.slug, "category");
    }

    #[test]
    fn test_list_active_categories() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();

        for name in ["Suspensión", "Aceites", "Baterías"] {
            get_or_create_category(&conn, name).unwrap();
        }
        let (hidden, _) = get_or_create_category(&conn, "Archivados").unwrap();
        set_category_active(&conn, hidden.id, false).unwrap();

        let names: Vec<String> = list_active_categories(&conn, None)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Aceites", "Baterías", "Suspensión"]);
        assert_eq!(list_active_categories(&conn, Some(2)).unwrap().len(), 2);
        assert!(get_category_by_slug(&conn, "archivados").unwrap().is_none());
        assert!(get_category_by_slug(&conn, "aceites").unwrap().is_some());
    }
}
