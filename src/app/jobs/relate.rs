use crate::core::Job;
use crate::db::queries::{products, related};
use crate::db::CatalogDb;
use crate::domain::model::Product;
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelateAction {
    Linked,
    Reordered,
    Unlinked,
    NotLinked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelateReport {
    pub from_sku: String,
    pub to_sku: String,
    pub action: RelateAction,
}

impl fmt::Display for RelateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.action {
            RelateAction::Linked => "linked",
            RelateAction::Reordered => "already linked, order updated",
            RelateAction::Unlinked => "unlinked",
            RelateAction::NotLinked => "were not linked",
        };
        write!(f, "{} <-> {} {}", self.from_sku, self.to_sku, verb)
    }
}

/// Links or unlinks two products (by SKU) in the related-products graph.
pub struct RelateJob {
    db: Arc<CatalogDb>,
    from_sku: String,
    to_sku: String,
    sort_order: i64,
    unlink: bool,
}

impl RelateJob {
    pub fn link(db: Arc<CatalogDb>, from_sku: &str, to_sku: &str, sort_order: i64) -> Self {
        Self {
            db,
            from_sku: from_sku.to_string(),
            to_sku: to_sku.to_string(),
            sort_order,
            unlink: false,
        }
    }

    pub fn unlink(db: Arc<CatalogDb>, from_sku: &str, to_sku: &str) -> Self {
        Self {
            unlink: true,
            ..Self::link(db, from_sku, to_sku, 0)
        }
    }
}

fn product_by_sku(conn: &Connection, sku: &str) -> Result<Product> {
    products::get_product_by_sku(conn, sku)?.ok_or_else(|| OpsError::NotFound {
        entity: "Product".to_string(),
        key: sku.to_string(),
    })
}

#[async_trait]
impl Job for RelateJob {
    type Report = RelateReport;

    fn name(&self) -> &'static str {
        "relate"
    }

    async fn run(&self) -> Result<RelateReport> {
        let conn = self.db.conn();
        let from = product_by_sku(&conn, &self.from_sku)?;
        let to = product_by_sku(&conn, &self.to_sku)?;

        let action = if self.unlink {
            match related::unlink_products(&conn, from.id, to.id)? {
                0 => RelateAction::NotLinked,
                _ => RelateAction::Unlinked,
            }
        } else if related::link_products(&conn, from.id, to.id, self.sort_order)? {
            RelateAction::Linked
        } else {
            RelateAction::Reordered
        };

        Ok(RelateReport {
            from_sku: from.sku,
            to_sku: to.sku,
            action,
        })
    }
}
