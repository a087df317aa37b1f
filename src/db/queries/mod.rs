//! Catalog queries, grouped by table:
//! - categories: get-or-create by name, slug lookup, active listing
//! - products: SKU/slug lookup, create/update, storefront listings
//! - variants: default variant, variant images and the main-image rule
//! - related: symmetric related-products edges
//! - site: the single site configuration row and hero slides
//! - references: stored image paths tracked by the WebP migration

pub mod categories;
pub mod products;
pub mod references;
pub mod related;
pub mod site;
pub mod variants;

use crate::utils::error::Result;
use rusqlite::Connection;

/// Runs `f` atomically. Joins the caller's transaction when one is already
/// open, otherwise opens its own.
pub(crate) fn atomically<T>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    if !conn.is_autocommit() {
        return f(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Maps a TEXT column parse failure into a rusqlite conversion error.
pub(crate) fn conversion_error(
    column: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(error))
}
