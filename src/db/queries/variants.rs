use super::atomically;
use crate::domain::model::{NewVariantImage, ProductVariant, VariantImage};
use crate::utils::error::{OpsError, Result};
use rusqlite::{Connection, OptionalExtension};

fn parse_variant_row(row: &rusqlite::Row) -> rusqlite::Result<ProductVariant> {
    Ok(ProductVariant {
        id: row.get(0)?,
        product_id: row.get(1)?,
        name: row.get(2)?,
        sort_order: row.get(3)?,
    })
}

fn parse_image_row(row: &rusqlite::Row) -> rusqlite::Result<VariantImage> {
    Ok(VariantImage {
        id: row.get(0)?,
        variant_id: row.get(1)?,
        image_url: row.get(2)?,
        image_file: row.get(3)?,
        alt_text: row.get(4)?,
        is_main: row.get(5)?,
        sort_order: row.get(6)?,
    })
}

/// Returns the product's variant called `name`, creating it when missing.
pub fn get_or_create_variant(conn: &Connection, product_id: i64, name: &str) -> Result<ProductVariant> {
    conn.execute(
        "INSERT OR IGNORE INTO product_variants (product_id, name) VALUES (?1, ?2)",
        rusqlite::params![product_id, name],
    )?;
    let variant = conn.query_row(
        "SELECT id, product_id, name, sort_order FROM product_variants
         WHERE product_id = ?1 AND name = ?2",
        rusqlite::params![product_id, name],
        parse_variant_row,
    )?;
    Ok(variant)
}

/// The unnamed variant every imported product carries.
pub fn ensure_default_variant(conn: &Connection, product_id: i64) -> Result<ProductVariant> {
    get_or_create_variant(conn, product_id, "")
}

pub fn list_variants(conn: &Connection, product_id: i64) -> Result<Vec<ProductVariant>> {
    let mut stmt = conn.prepare(
        "SELECT id, product_id, name, sort_order FROM product_variants
         WHERE product_id = ?1 ORDER BY sort_order, id",
    )?;
    let variants = stmt
        .query_map([product_id], parse_variant_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(variants)
}

/// Images of a variant, main image first.
pub fn list_variant_images(conn: &Connection, variant_id: i64) -> Result<Vec<VariantImage>> {
    let mut stmt = conn.prepare(
        "SELECT id, variant_id, image_url, image_file, alt_text, is_main, sort_order
         FROM variant_images WHERE variant_id = ?1
         ORDER BY is_main DESC, sort_order, id",
    )?;
    let images = stmt
        .query_map([variant_id], parse_image_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(images)
}

pub fn count_variant_images(conn: &Connection, variant_id: i64) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM variant_images WHERE variant_id = ?1",
        [variant_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

pub fn has_main_image(conn: &Connection, variant_id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM variant_images WHERE variant_id = ?1 AND is_main = 1)",
        [variant_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn delete_variant_images(conn: &Connection, variant_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM variant_images WHERE variant_id = ?1", [variant_id])?)
}

/// Adds an image. A new main image demotes the previous one in the same
/// transaction.
pub fn add_variant_image(
    conn: &Connection,
    variant_id: i64,
    image: &NewVariantImage,
) -> Result<VariantImage> {
    atomically(conn, |conn| {
        if image.is_main {
            conn.execute(
                "UPDATE variant_images SET is_main = 0 WHERE variant_id = ?1 AND is_main = 1",
                [variant_id],
            )?;
        }
        conn.execute(
            "INSERT INTO variant_images (variant_id, image_url, image_file, alt_text, is_main, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                variant_id,
                image.image_url,
                image.image_file,
                image.alt_text,
                image.is_main,
                image.sort_order
            ],
        )?;
        let id = conn.last_insert_rowid();
        get_variant_image(conn, id)?.ok_or_else(|| OpsError::NotFound {
            entity: "VariantImage".to_string(),
            key: id.to_string(),
        })
    })
}

pub fn get_variant_image(conn: &Connection, id: i64) -> Result<Option<VariantImage>> {
    Ok(conn
        .query_row(
            "SELECT id, variant_id, image_url, image_file, alt_text, is_main, sort_order
             FROM variant_images WHERE id = ?1",
            [id],
            parse_image_row,
        )
        .optional()?)
}

/// Makes `image_id` the single main image of its variant.
pub fn set_main_image(conn: &Connection, image_id: i64) -> Result<()> {
    atomically(conn, |conn| {
        let image = get_variant_image(conn, image_id)?.ok_or_else(|| OpsError::NotFound {
            entity: "VariantImage".to_string(),
            key: image_id.to_string(),
        })?;
        conn.execute(
            "UPDATE variant_images SET is_main = 0 WHERE variant_id = ?1 AND is_main = 1",
            [image.variant_id],
        )?;
        conn.execute("UPDATE variant_images SET is_main = 1 WHERE id = ?1", [image_id])?;
        Ok(())
    })
}

/// Highest sort order used by a variant's images, or -1 when it has none.
pub fn max_image_sort_order(conn: &Connection, variant_id: i64) -> Result<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(sort_order) FROM variant_images WHERE variant_id = ?1",
        [variant_id],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(-1))
}
