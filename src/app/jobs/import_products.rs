//! Spreadsheet-driven catalog import.
//!
//! Phase one maps the header row, then writes categories, products and
//! default variants for every row inside a single transaction. Phase two
//! (optional) finds images on disk for each imported SKU and uploads them
//! through the WebP storage adapter.

use crate::adapters::sheet::{self, ColumnMapping, SheetData, SheetRow};
use crate::adapters::storage::WebpStorage;
use crate::core::paths;
use crate::core::slug::slugify;
use crate::core::{Job, ObjectStore};
use crate::db::queries::{categories, products, variants};
use crate::db::CatalogDb;
use crate::domain::model::{NewVariantImage, ProductFields};
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub const DEFAULT_IMAGES_LIMIT: usize = 10;

/// Characters allowed right after the SKU in an image file stem.
const SKU_STEM_SEPARATORS: &[char] = &['_', '-', '.', ' ', '('];

#[derive(Debug, Clone)]
pub struct ImageImportOptions {
    pub dir: PathBuf,
    /// Drop existing variant images before uploading.
    pub replace: bool,
    /// Images per SKU; 0 means no limit.
    pub limit: usize,
}

impl ImageImportOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            replace: false,
            limit: DEFAULT_IMAGES_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub file: PathBuf,
    pub sheet: Option<String>,
    /// Overwrite products whose SKU already exists.
    pub update_existing: bool,
    pub images: Option<ImageImportOptions>,
}

impl ImportOptions {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            sheet: None,
            update_existing: false,
            images: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub categories_created: usize,
    pub products_created: usize,
    pub products_updated: usize,
    pub products_unchanged: usize,
    pub images_uploaded: usize,
    pub images_failed: usize,
    pub variants_with_existing_images: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows ({} skipped): {} new categories, {} products created, {} updated, {} unchanged",
            self.rows_read,
            self.rows_skipped,
            self.categories_created,
            self.products_created,
            self.products_updated,
            self.products_unchanged
        )?;
        if self.images_uploaded + self.images_failed + self.variants_with_existing_images > 0 {
            write!(
                f,
                "; images: {} uploaded, {} failed, {} variants already had images",
                self.images_uploaded, self.images_failed, self.variants_with_existing_images
            )?;
        }
        Ok(())
    }
}

/// A product touched by the row phase, kept for the image phase.
#[derive(Debug, Clone)]
struct ImportedProduct {
    sku: String,
    name: String,
    variant_id: i64,
}

pub struct ImportProductsJob<S: ObjectStore> {
    db: Arc<CatalogDb>,
    storage: WebpStorage<S>,
    options: ImportOptions,
}

impl<S: ObjectStore> ImportProductsJob<S> {
    pub fn new(db: Arc<CatalogDb>, storage: WebpStorage<S>, options: ImportOptions) -> Self {
        Self {
            db,
            storage,
            options,
        }
    }

    fn import_rows(
        &self,
        sheet: &SheetData,
        mapping: &ColumnMapping,
        report: &mut ImportReport,
    ) -> Result<Vec<ImportedProduct>> {
        self.db.with_transaction(|tx| {
            let mut imported = Vec::new();
            for row in &sheet.rows {
                report.rows_read += 1;
                let outcome = import_row(tx, row, mapping, self.options.update_existing, report)
                    .map_err(|e| OpsError::RowError {
                        row: row.number,
                        message: e.to_string(),
                    })?;
                match outcome {
                    Some(product) => imported.push(product),
                    None => report.rows_skipped += 1,
                }
            }
            Ok(imported)
        })
    }

    async fn import_images(
        &self,
        options: &ImageImportOptions,
        imported: &[ImportedProduct],
        report: &mut ImportReport,
    ) -> Result<()> {
        let files = collect_image_files(&options.dir);
        tracing::info!(
            "🖼️ {} image file(s) found under {}",
            files.len(),
            options.dir.display()
        );

        let mut seen = HashSet::new();
        for product in imported {
            if !seen.insert(product.sku.to_lowercase()) {
                continue;
            }

            let matches = match_sku_images(&files, &product.sku, options.limit);
            if matches.is_empty() {
                tracing::debug!("No images for SKU {}", product.sku);
                continue;
            }

            {
                let conn = self.db.conn();
                let existing = variants::count_variant_images(&conn, product.variant_id)?;
                if existing > 0 {
                    if !options.replace {
                        tracing::debug!(
                            "SKU {} already has {} image(s); use --replace-images to overwrite",
                            product.sku,
                            existing
                        );
                        report.variants_with_existing_images += 1;
                        continue;
                    }
                    variants::delete_variant_images(&conn, product.variant_id)?;
                }
            }

            let folder = Some(slugify(&product.sku))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| product.sku.to_lowercase());

            for path in matches {
                match self.upload_image(product, &folder, &path).await {
                    Ok(stored) => {
                        tracing::debug!("  ⬆️ {} -> {}", path.display(), stored);
                        report.images_uploaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!("  ⚠️ Image {} for SKU {} failed: {}", path.display(), product.sku, e);
                        report.images_failed += 1;
                    }
                }
            }
        }

        Ok(())
    }

    async fn upload_image(&self, product: &ImportedProduct, folder: &str, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OpsError::ValidationError {
                message: format!("unusable file name: {}", path.display()),
            })?;
        let data = tokio::fs::read(path).await?;
        let stored = self
            .storage
            .save(&format!("variants/{}/{}", folder, file_name), &data)
            .await?;

        let conn = self.db.conn();
        let is_main = !variants::has_main_image(&conn, product.variant_id)?;
        let sort_order = variants::max_image_sort_order(&conn, product.variant_id)? + 1;
        variants::add_variant_image(
            &conn,
            product.variant_id,
            &NewVariantImage {
                image_url: String::new(),
                image_file: Some(stored.clone()),
                alt_text: product.name.clone(),
                is_main,
                sort_order,
            },
        )?;

        Ok(stored)
    }
}

/// Writes one spreadsheet row. `None` means the row was skipped.
fn import_row(
    conn: &Connection,
    row: &SheetRow,
    mapping: &ColumnMapping,
    update_existing: bool,
    report: &mut ImportReport,
) -> Result<Option<ImportedProduct>> {
    let category_name = row.text(Some(mapping.category));
    if category_name.is_empty() {
        tracing::warn!("Row {}: no category; skipping", row.number);
        return Ok(None);
    }
    let sku = row.text(Some(mapping.sku));
    if sku.is_empty() {
        tracing::warn!("Row {}: no SKU; skipping", row.number);
        return Ok(None);
    }

    let (category, created) = categories::get_or_create_category(conn, &category_name)?;
    if created {
        report.categories_created += 1;
    }

    let name = Some(row.text(mapping.name))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| sku.clone());
    let image_url = Some(row.text(mapping.image_url)).filter(|u| !u.is_empty());

    let fields = ProductFields {
        name: name.clone(),
        category_id: category.id,
        description: row.text(mapping.description),
        price: sheet::parse_decimal(row.cell(mapping.price))
            .map(|p| p.round_dp(2))
            .unwrap_or(Decimal::ZERO),
        stock: sheet::parse_int(row.cell(mapping.stock))
            .filter(|s| *s >= 0)
            .unwrap_or(0),
        is_active: true,
        image_url,
    };

    let product = match products::get_product_by_sku(conn, &sku)? {
        None => {
            let slug = products::make_unique_product_slug(conn, &name, &sku, None)?;
            report.products_created += 1;
            products::create_product(conn, &sku, &slug, &fields)?
        }
        Some(existing) if update_existing => {
            let slug = products::make_unique_product_slug(conn, &name, &sku, Some(existing.id))?;
            report.products_updated += 1;
            products::update_product(conn, existing.id, &slug, &fields)?
        }
        Some(existing) => {
            report.products_unchanged += 1;
            existing
        }
    };

    let variant = variants::ensure_default_variant(conn, product.id)?;
    Ok(Some(ImportedProduct {
        sku,
        name: product.name,
        variant_id: variant.id,
    }))
}

/// Every raster image file under `dir`, sorted by path.
fn collect_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("⚠️ Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.to_str().map(paths::is_image_file).unwrap_or(false))
        .collect();
    files.sort();
    files
}

/// Images belonging to `sku`: files inside a directory named after the
/// SKU, or whose stem is the SKU, optionally followed by a separator and
/// a suffix (`ABC-1_2.jpg`, `ABC-1 (3).png`). Case-insensitive. `limit` 0
/// keeps every match.
pub fn match_sku_images(files: &[PathBuf], sku: &str, limit: usize) -> Vec<PathBuf> {
    let sku = sku.to_lowercase();
    let matches = files.iter().filter(|path| {
        let parent_matches = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase() == sku)
            .unwrap_or(false);
        if parent_matches {
            return true;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        let stem = stem.to_lowercase();
        match stem.strip_prefix(sku.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(SKU_STEM_SEPARATORS),
            None => false,
        }
    });

    if limit == 0 {
        matches.cloned().collect()
    } else {
        matches.take(limit).cloned().collect()
    }
}

#[async_trait]
impl<S: ObjectStore> Job for ImportProductsJob<S> {
    type Report = ImportReport;

    fn name(&self) -> &'static str {
        "import-products"
    }

    async fn run(&self) -> Result<ImportReport> {
        if let Some(images) = &self.options.images {
            if !images.dir.is_dir() {
                return Err(OpsError::InputNotFound {
                    path: images.dir.display().to_string(),
                });
            }
        }

        let sheet = SheetData::from_path(&self.options.file, self.options.sheet.as_deref())?;
        if sheet.headers.iter().all(|h| h.is_empty()) {
            return Err(OpsError::ValidationError {
                message: "the first row holds no usable headers".to_string(),
            });
        }
        tracing::info!("📑 Headers: {:?}", sheet.headers);

        let mapping = ColumnMapping::from_headers(&sheet.headers)?;
        let mut report = ImportReport::default();

        let imported = self.import_rows(&sheet, &mapping, &mut report)?;
        tracing::info!(
            "📦 {} row(s) imported, {} skipped",
            imported.len(),
            report.rows_skipped
        );

        if let Some(images) = &self.options.images {
            self.import_images(images, &imported, &mut report).await?;
        }

        Ok(report)
    }
}
