use crate::core::text::{normalize_description, CHECK_MARK};
use crate::core::Job;
use crate::db::queries::products;
use crate::db::CatalogDb;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FixDescriptionsOptions {
    /// Write the changes; otherwise only report them.
    pub apply: bool,
    pub only_with_check: bool,
    /// Maximum products examined; 0 means all.
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixDescriptionsReport {
    pub examined: usize,
    pub changed: usize,
    pub applied: bool,
    pub changed_skus: Vec<String>,
}

impl fmt::Display for FixDescriptionsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.applied {
            write!(f, "{}/{} descriptions updated", self.changed, self.examined)
        } else {
            write!(
                f,
                "[DRY-RUN] {}/{} descriptions would change",
                self.changed, self.examined
            )
        }
    }
}

pub struct FixDescriptionsJob {
    db: Arc<CatalogDb>,
    options: FixDescriptionsOptions,
}

impl FixDescriptionsJob {
    pub fn new(db: Arc<CatalogDb>, options: FixDescriptionsOptions) -> Self {
        Self { db, options }
    }
}

#[async_trait]
impl Job for FixDescriptionsJob {
    type Report = FixDescriptionsReport;

    fn name(&self) -> &'static str {
        "fix-descriptions"
    }

    async fn run(&self) -> Result<FixDescriptionsReport> {
        let filter = self
            .options
            .only_with_check
            .then(|| CHECK_MARK.to_string());

        self.db.with_transaction(|tx| {
            let candidates =
                products::list_products_by_id(tx, filter.as_deref(), self.options.limit)?;
            tracing::info!("🔍 Products to review: {}", candidates.len());

            let mut report = FixDescriptionsReport {
                examined: candidates.len(),
                applied: self.options.apply,
                ..Default::default()
            };

            for product in candidates {
                let normalized = normalize_description(&product.description);
                if normalized == product.description {
                    continue;
                }
                tracing::debug!("✏️ {} ({})", product.sku, product.name);
                report.changed += 1;
                report.changed_skus.push(product.sku.clone());
                if self.options.apply {
                    products::update_description(tx, product.id, &normalized)?;
                }
            }

            Ok(report)
        })
    }
}
