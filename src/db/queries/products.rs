use super::conversion_error;
use crate::core::slug::{slugify, unique_slug};
use crate::domain::model::{Product, ProductFields};
use crate::utils::error::{OpsError, Result};
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::str::FromStr;

const PRODUCT_COLUMNS: &str = "id, name, slug, sku, category_id, description, image_url, \
     image_file, price, stock, is_active, created_at, updated_at";

/// Expects columns in `PRODUCT_COLUMNS` order.
fn parse_product_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    let price: String = row.get(8)?;
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        sku: row.get(3)?,
        category_id: row.get(4)?,
        description: row.get(5)?,
        image_url: row.get(6)?,
        image_file: row.get(7)?,
        price: Decimal::from_str(&price).map_err(|e| conversion_error(8, e))?,
        stock: row.get(9)?,
        is_active: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn query_products(
    conn: &Connection,
    clause: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Product>> {
    let sql = format!("SELECT {} FROM products {}", PRODUCT_COLUMNS, clause);
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map(params, parse_product_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(products)
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    Ok(conn.query_row(&sql, [id], parse_product_row).optional()?)
}

pub fn get_product_by_sku(conn: &Connection, sku: &str) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE sku = ?1", PRODUCT_COLUMNS);
    Ok(conn.query_row(&sql, [sku], parse_product_row).optional()?)
}

/// Active product by slug.
pub fn get_active_product_by_slug(conn: &Connection, slug: &str) -> Result<Option<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE slug = ?1 AND is_active = 1",
        PRODUCT_COLUMNS
    );
    Ok(conn.query_row(&sql, [slug], parse_product_row).optional()?)
}

fn require_product(conn: &Connection, id: i64) -> Result<Product> {
    get_product(conn, id)?.ok_or_else(|| OpsError::NotFound {
        entity: "Product".to_string(),
        key: id.to_string(),
    })
}

/// Free slug for a product: slug of the name, else of the SKU, else the
/// lowercased SKU, suffixed `-2`, `-3`, ... while taken by another product.
pub fn make_unique_product_slug(
    conn: &Connection,
    name: &str,
    sku: &str,
    exclude_id: Option<i64>,
) -> Result<String> {
    let base = [slugify(name), slugify(sku), sku.to_lowercase()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| "product".to_string());

    unique_slug(&base, |candidate| {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM products WHERE slug = ?1 AND id IS NOT ?2)",
            rusqlite::params![candidate, exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    })
}

pub fn create_product(
    conn: &Connection,
    sku: &str,
    slug: &str,
    fields: &ProductFields,
) -> Result<Product> {
    conn.execute(
        "INSERT INTO products (name, slug, sku, category_id, description, image_url, price, stock, is_active)
         VALUES (:name, :slug, :sku, :category_id, :description, :image_url, :price, :stock, :is_active)",
        rusqlite::named_params! {
            ":name": &fields.name,
            ":slug": slug,
            ":sku": sku,
            ":category_id": fields.category_id,
            ":description": &fields.description,
            ":image_url": fields.image_url.as_deref().unwrap_or(""),
            ":price": fields.price.to_string(),
            ":stock": fields.stock,
            ":is_active": fields.is_active,
        },
    )?;
    require_product(conn, conn.last_insert_rowid())
}

/// Overwrites every field and the slug. A `None` image URL keeps the
/// stored one.
pub fn update_product(
    conn: &Connection,
    id: i64,
    slug: &str,
    fields: &ProductFields,
) -> Result<Product> {
    let changed = conn.execute(
        "UPDATE products SET
            name = :name,
            slug = :slug,
            category_id = :category_id,
            description = :description,
            image_url = COALESCE(:image_url, image_url),
            price = :price,
            stock = :stock,
            is_active = :is_active,
            updated_at = datetime('now')
         WHERE id = :id",
        rusqlite::named_params! {
            ":id": id,
            ":name": &fields.name,
            ":slug": slug,
            ":category_id": fields.category_id,
            ":description": &fields.description,
            ":image_url": fields.image_url.as_deref(),
            ":price": fields.price.to_string(),
            ":stock": fields.stock,
            ":is_active": fields.is_active,
        },
    )?;
    if changed == 0 {
        return Err(OpsError::NotFound {
            entity: "Product".to_string(),
            key: id.to_string(),
        });
    }
    require_product(conn, id)
}

pub fn update_description(conn: &Connection, id: i64, description: &str) -> Result<()> {
    conn.execute(
        "UPDATE products SET description = ?2, updated_at = datetime('now') WHERE id = ?1",
        rusqlite::params![id, description],
    )?;
    Ok(())
}

pub fn set_product_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE products SET is_active = ?2, updated_at = datetime('now') WHERE id = ?1",
        rusqlite::params![id, active],
    )?;
    Ok(())
}

/// Products in id order, for maintenance passes. `limit` 0 means all.
pub fn list_products_by_id(conn: &Connection, only_with: Option<&str>, limit: usize) -> Result<Vec<Product>> {
    let limit = if limit == 0 { -1 } else { limit as i64 };
    match only_with {
        Some(needle) => query_products(
            conn,
            "WHERE instr(description, ?1) > 0 ORDER BY id LIMIT ?2",
            rusqlite::params![needle, limit],
        ),
        None => query_products(conn, "ORDER BY id LIMIT ?1", [limit]),
    }
}

/// Active products ordered by name, optionally within one category.
pub fn list_active_products(conn: &Connection, category_id: Option<i64>) -> Result<Vec<Product>> {
    match category_id {
        Some(category_id) => query_products(
            conn,
            "WHERE is_active = 1 AND category_id = ?1 ORDER BY name, id",
            [category_id],
        ),
        None => query_products(conn, "WHERE is_active = 1 ORDER BY name, id", []),
    }
}

/// Newest active products first.
pub fn newest_active_products(conn: &Connection, limit: usize) -> Result<Vec<Product>> {
    query_products(
        conn,
        "WHERE is_active = 1 ORDER BY created_at DESC, id DESC LIMIT ?1",
        [limit as i64],
    )
}

/// Active products sharing a category, skipping the given ids.
pub fn active_in_category_excluding(
    conn: &Connection,
    category_id: i64,
    exclude: &[i64],
    limit: usize,
) -> Result<Vec<Product>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let candidates = query_products(
        conn,
        "WHERE is_active = 1 AND category_id = ?1 ORDER BY name, id",
        [category_id],
    )?;
    Ok(candidates
        .into_iter()
        .filter(|p| !exclude.contains(&p.id))
        .take(limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::categories::get_or_create_category;
    use crate::db::CatalogDb;

    fn fields(name: &str, category_id: i64) -> ProductFields {
        ProductFields {
            name: name.to_string(),
            category_id,
            description: String::new(),
            price: Decimal::from_str("10.50").unwrap(),
            stock: 3,
            is_active: true,
            image_url: None,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let (category, _) = get_or_create_category(&conn, "Filtros").unwrap();

        let slug = make_unique_product_slug(&conn, "Filtro de Aire", "FA-1", None).unwrap();
        let product = create_product(&conn, "FA-1", &slug, &fields("Filtro de Aire", category.id))
            .unwrap();

        assert_eq!(product.slug, "filtro-de-aire");
        assert_eq!(product.price, Decimal::from_str("10.50").unwrap());
        assert_eq!(product.image_url, "");
        assert_eq!(get_product_by_sku(&conn, "FA-1").unwrap().unwrap().id, product.id);
        assert!(get_active_product_by_slug(&conn, "filtro-de-aire")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_slug_collisions_and_exclusion() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let (category, _) = get_or_create_category(&conn, "Filtros").unwrap();

        let first = create_product(&conn, "A", "filtro", &fields("Filtro", category.id)).unwrap();
        assert_eq!(
            make_unique_product_slug(&conn, "Filtro", "B", None).unwrap(),
            "filtro-2"
        );
        // 自己的 slug 不算衝突
        assert_eq!(
            make_unique_product_slug(&conn, "Filtro", "A", Some(first.id)).unwrap(),
            "filtro"
        );
        // 名稱無法產生 slug 時改用 SKU
        assert_eq!(
            make_unique_product_slug(&conn, "???", "XK-77", None).unwrap(),
            "xk-77"
        );
    }

    #[test]
    fn test_update_keeps_image_url_when_absent() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let (category, _) = get_or_create_category(&conn, "Filtros").unwrap();

        let mut initial = fields("Filtro", category.id);
        initial.image_url = Some("https://img.example.com/f.jpg".to_string());
        let product = create_product(&conn, "A", "filtro", &initial).unwrap();

        let mut changed = fields("Filtro Premium", category.id);
        changed.stock = 0;
        let updated = update_product(&conn, product.id, "filtro-premium", &changed).unwrap();
        assert_eq!(updated.name, "Filtro Premium");
        assert_eq!(updated.stock, 0);
        assert_eq!(updated.image_url, "https://img.example.com/f.jpg");

        assert!(matches!(
            update_product(&conn, 999, "x", &changed),
            Err(OpsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_negative_stock_is_rejected_by_schema() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let (category, _) = get_or_create_category(&conn, "Filtros").unwrap();

        let mut bad = fields("Filtro", category.id);
        bad.stock = -1;
        assert!(create_product(&conn, "A", "filtro", &bad).is_err());
    }

    #[test]
    fn test_listing_helpers() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let (filtros, _) = get_or_create_category(&conn, "Filtros").unwrap();
        let (frenos, _) = get_or_create_category(&conn, "Frenos").unwrap();

        let b = create_product(&conn, "B", "b", &fields("Bujía", filtros.id)).unwrap();
        let a = create_product(&conn, "A", "a", &fields("Aceite", filtros.id)).unwrap();
        let c = create_product(&conn, "C", "c", &fields("Cable", frenos.id)).unwrap();
        set_product_active(&conn, c.id, false).unwrap();
        update_description(&conn, b.id, "Bujía ✅ doble").unwrap();

        let names: Vec<_> = list_active_products(&conn, None)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Aceite", "Bujía"]);
        assert!(list_active_products(&conn, Some(frenos.id)).unwrap().is_empty());

        let newest = newest_active_products(&conn, 1).unwrap();
        assert_eq!(newest[0].id, a.id);

        let others = active_in_category_excluding(&conn, filtros.id, &[a.id], 8).unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, b.id);

        let with_check = list_products_by_id(&conn, Some("✅"), 0).unwrap();
        assert_eq!(with_check.len(), 1);
        assert_eq!(list_products_by_id(&conn, None, 2).unwrap().len(), 2);
    }
}
