//! Related products are stored as directed edges but maintained in pairs:
//! the only writers are [`link_products`] and [`unlink_products`], and both
//! touch the two directions in one transaction.

use super::atomically;
use crate::domain::model::RelatedProduct;
use crate::utils::error::{OpsError, Result};
use rusqlite::Connection;

fn parse_related_row(row: &rusqlite::Row) -> rusqlite::Result<RelatedProduct> {
    Ok(RelatedProduct {
        id: row.get(0)?,
        from_product_id: row.get(1)?,
        to_product_id: row.get(2)?,
        sort_order: row.get(3)?,
    })
}

/// Relates `a` and `b` in both directions. `sort_order` applies to the
/// `a -> b` edge; an existing reverse edge keeps its own order. Returns
/// `true` when the `a -> b` edge did not exist before.
pub fn link_products(conn: &Connection, a: i64, b: i64, sort_order: i64) -> Result<bool> {
    if a == b {
        return Err(OpsError::ValidationError {
            message: format!("product {} cannot be related to itself", a),
        });
    }

    atomically(conn, |conn| {
        let existed: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM related_products WHERE from_product_id = ?1 AND to_product_id = ?2)",
            [a, b],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO related_products (from_product_id, to_product_id, sort_order)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (from_product_id, to_product_id) DO UPDATE SET sort_order = excluded.sort_order",
            [a, b, sort_order],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO related_products (from_product_id, to_product_id, sort_order)
             VALUES (?1, ?2, ?3)",
            [b, a, sort_order],
        )?;

        Ok(!existed)
    })
}

/// Removes both directions; returns the number of edge rows deleted.
pub fn unlink_products(conn: &Connection, a: i64, b: i64) -> Result<usize> {
    atomically(conn, |conn| {
        let deleted = conn.execute(
            "DELETE FROM related_products
             WHERE (from_product_id = ?1 AND to_product_id = ?2)
                OR (from_product_id = ?2 AND to_product_id = ?1)",
            [a, b],
        )?;
        Ok(deleted)
    })
}

/// Outgoing edges of a product by sort order.
pub fn related_edges(conn: &Connection, product_id: i64) -> Result<Vec<RelatedProduct>> {
    let mut stmt = conn.prepare(
        "SELECT id, from_product_id, to_product_id, sort_order FROM related_products
         WHERE from_product_id = ?1 ORDER BY sort_order, id",
    )?;
    let edges = stmt
        .query_map([product_id], parse_related_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::{categories, products};
    use crate::db::CatalogDb;
    use crate::domain::model::ProductFields;
    use rust_decimal::Decimal;

    fn create(conn: &Connection, sku: &str) -> i64 {
        let (category, _) = categories::get_or_create_category(conn, "Filtros").unwrap();
        let fields = ProductFields {
            name: sku.to_string(),
            category_id: category.id,
            description: String::new(),
            price: Decimal::ZERO,
            stock: 0,
            is_active: true,
            image_url: None,
        };
        products::create_product(conn, sku, &sku.to_lowercase(), &fields)
            .unwrap()
            .id
    }

    fn edge_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM related_products", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_link_is_symmetric() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let a = create(&conn, "A");
        let b = create(&conn, "B");

        assert!(link_products(&conn, a, b, 2).unwrap());
        assert_eq!(edge_count(&conn), 2);
        assert_eq!(related_edges(&conn, b).unwrap()[0].to_product_id, a);

        // 重複連結只更新排序
        assert!(!link_products(&conn, a, b, 5).unwrap());
        assert_eq!(edge_count(&conn), 2);
        assert_eq!(related_edges(&conn, a).unwrap()[0].sort_order, 5);
        assert_eq!(related_edges(&conn, b).unwrap()[0].sort_order, 2);
    }

    #[test]
    fn test_unlink_removes_both_directions() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let a = create(&conn, "A");
        let b = create(&conn, "B");
        let c = create(&conn, "C");

        link_products(&conn, a, b, 0).unwrap();
        link_products(&conn, a, c, 1).unwrap();
        assert_eq!(unlink_products(&conn, b, a).unwrap(), 2);
        assert_eq!(edge_count(&conn), 2);
        assert_eq!(unlink_products(&conn, b, a).unwrap(), 0);
    }

    #[test]
    fn test_self_link_rejected() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();
        let a = create(&conn, "A");
        assert!(matches!(
            link_products(&conn, a, a, 0),
            Err(OpsError::ValidationError { .. })
        ));
        assert_eq!(edge_count(&conn), 0);
    }
}
