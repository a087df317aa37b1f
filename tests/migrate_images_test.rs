mod common;

use depoauto_ops::app::jobs::MigrateImagesJob;
use depoauto_ops::core::paths::StorageLocation;
use depoauto_ops::core::{Job, ObjectStore, PathReferences, PutOptions};
use depoauto_ops::db::queries::{site, variants};
use depoauto_ops::domain::model::{HeroImageSlot, NewVariantImage};
use depoauto_ops::{CatalogDb, MemoryStorage};
use rust_decimal::Decimal;
use std::sync::Arc;

async fn put(store: &MemoryStorage, key: &str, data: &[u8]) {
    store.write_object(key, data, &PutOptions::default()).await.unwrap();
}

#[tokio::test]
async fn test_undecodable_object_is_left_alone() {
    let store = MemoryStorage::new();
    put(&store, "media/products/broken.jpg", b"definitely not a jpeg").await;

    let db = Arc::new(CatalogDb::open_in_memory().unwrap());
    let product = common::add_product(&db, "Frenos", "BR-1", Decimal::ONE);
    common::set_product_image_file(&db, product.id, "products/broken.jpg");

    let report = MigrateImagesJob::new(store.clone(), db.clone(), StorageLocation::new("media"))
        .run()
        .await
        .unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.converted, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors, 0);
    assert_eq!(store.keys().await, vec!["media/products/broken.jpg".to_string()]);
    assert_eq!(db.count_references("products/broken.jpg").unwrap(), 1);
}

#[cfg(feature = "webp")]
mod conversion {
    use super::*;
    use depoauto_ops::domain::model::ObjectInfo;
    use depoauto_ops::{OpsError, Result};
    use image::ColorType;

    /// Wraps a [`MemoryStorage`] and fails one operation for one key.
    #[derive(Clone)]
    struct FailingStore {
        inner: MemoryStorage,
        fail_read: Option<&'static str>,
        fail_write: Option<&'static str>,
        fail_delete: Option<&'static str>,
    }

    impl FailingStore {
        fn new(inner: MemoryStorage) -> Self {
            Self {
                inner,
                fail_read: None,
                fail_write: None,
                fail_delete: None,
            }
        }

        fn injected(op: &str, key: &str) -> OpsError {
            OpsError::StorageError {
                message: format!("{} {}: connection reset", op, key),
            }
        }
    }

    impl ObjectStore for FailingStore {
        async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
            self.inner.list_objects(prefix).await
        }

        async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
            if self.fail_read == Some(key) {
                return Err(Self::injected("GET", key));
            }
            self.inner.read_object(key).await
        }

        async fn write_object(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
            if self.fail_write == Some(key) {
                return Err(Self::injected("PUT", key));
            }
            self.inner.write_object(key, data, options).await
        }

        async fn delete_object(&self, key: &str) -> Result<()> {
            if self.fail_delete == Some(key) {
                return Err(Self::injected("DELETE", key));
            }
            self.inner.delete_object(key).await
        }
    }

    /// Two products share `products/a.jpg`; a variant image and the first
    /// hero slot point at `products/cover.png`.
    async fn seeded() -> (MemoryStorage, Arc<CatalogDb>) {
        let store = MemoryStorage::new();
        put(&store, "media/products/a.jpg", &common::jpeg_rgb()).await;
        put(&store, "media/products/cover.png", &common::png_with_alpha()).await;
        put(&store, "media/docs/manual.pdf", b"%PDF-1.4").await;
        put(&store, "other/outside.png", &common::opaque_png()).await;

        let db = Arc::new(CatalogDb::open_in_memory().unwrap());
        let first = common::add_product(&db, "Frenos", "BR-1", Decimal::ONE);
        let second = common::add_product(&db, "Frenos", "BR-2", Decimal::ONE);
        common::set_product_image_file(&db, first.id, "products/a.jpg");
        common::set_product_image_file(&db, second.id, "products/a.jpg");

        {
            let conn = db.conn();
            let variant = variants::ensure_default_variant(&conn, first.id).unwrap();
            variants::add_variant_image(
                &conn,
                variant.id,
                &NewVariantImage {
                    image_file: Some("products/cover.png".to_string()),
                    is_main: true,
                    ..Default::default()
                },
            )
            .unwrap();

            let mut config = site::load_site_config(&conn).unwrap();
            config.hero_images[0] = HeroImageSlot {
                file: Some("products/cover.png".to_string()),
                url: String::new(),
            };
            site::update_site_config(&conn, &config).unwrap();
        }

        (store, db)
    }

    #[tokio::test]
    async fn test_migration_converts_and_repoints_references() {
        let (store, db) = seeded().await;

        let report = MigrateImagesJob::new(store.clone(), db.clone(), StorageLocation::new("media"))
            .run()
            .await
            .unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.converted, 2);
        assert_eq!(report.references_updated, 4);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.errors, 0);

        assert_eq!(
            store.keys().await,
            vec![
                "media/docs/manual.pdf".to_string(),
                "media/products/a.webp".to_string(),
                "media/products/cover.webp".to_string(),
                "other/outside.png".to_string(),
            ]
        );

        assert_eq!(db.count_references("products/a.jpg").unwrap(), 0);
        assert_eq!(db.count_references("products/a.webp").unwrap(), 2);
        assert_eq!(db.count_references("products/cover.png").unwrap(), 0);
        assert_eq!(db.count_references("products/cover.webp").unwrap(), 2);

        let photo = store.get("media/products/a.webp").await.unwrap();
        assert_eq!(photo.options.content_type.as_deref(), Some("image/webp"));
        assert_eq!(photo.options.cache_control.as_deref(), Some("max-age=604800"));
        let decoded = image::load_from_memory(&photo.data).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgb8);

        let cover = store.get("media/products/cover.webp").await.unwrap();
        let decoded = image::load_from_memory(&cover.data).unwrap();
        assert_eq!(decoded.color(), ColorType::Rgba8);
    }

    #[tokio::test]
    async fn test_second_pass_changes_nothing() {
        let (store, db) = seeded().await;
        let location = StorageLocation::new("media");

        MigrateImagesJob::new(store.clone(), db.clone(), location.clone())
            .run()
            .await
            .unwrap();
        let keys_after_first = store.keys().await;

        let again = MigrateImagesJob::new(store.clone(), db.clone(), location)
            .run()
            .await
            .unwrap();

        assert_eq!(again.converted, 0);
        assert_eq!(again.references_updated, 0);
        assert_eq!(again.deleted, 0);
        assert_eq!(store.keys().await, keys_after_first);
    }

    #[tokio::test]
    async fn test_no_delete_keeps_originals() {
        let (store, db) = seeded().await;

        let report = MigrateImagesJob::new(store.clone(), db.clone(), StorageLocation::new("media"))
            .delete_originals(false)
            .run()
            .await
            .unwrap();

        assert_eq!(report.converted, 2);
        assert_eq!(report.deleted, 0);
        assert!(store.get("media/products/a.jpg").await.is_some());
        assert!(store.get("media/products/a.webp").await.is_some());
        assert_eq!(db.count_references("products/a.webp").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bucket_root_location() {
        let store = MemoryStorage::new();
        put(&store, "banners/top.PNG", &common::opaque_png()).await;

        let db = Arc::new(CatalogDb::open_in_memory().unwrap());
        let product = common::add_product(&db, "Luces", "LU-1", Decimal::ONE);
        common::set_product_image_file(&db, product.id, "banners/top.PNG");

        let report = MigrateImagesJob::new(store.clone(), db.clone(), StorageLocation::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.converted, 1);
        assert_eq!(store.keys().await, vec!["banners/top.webp".to_string()]);
        assert_eq!(db.count_references("banners/top.webp").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_object_untouched_and_moves_on() {
        let (memory, db) = seeded().await;
        let mut store = FailingStore::new(memory.clone());
        store.fail_write = Some("media/products/a.webp");

        let report = MigrateImagesJob::new(store, db.clone(), StorageLocation::new("media"))
            .run()
            .await
            .unwrap();

        assert_eq!(report.converted, 1);
        assert_eq!(report.references_updated, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.errors, 1);

        assert!(memory.get("media/products/a.jpg").await.is_some());
        assert!(memory.get("media/products/a.webp").await.is_none());
        assert_eq!(db.count_references("products/a.jpg").unwrap(), 2);
        assert_eq!(db.count_references("products/a.webp").unwrap(), 0);

        // 後面的物件照常轉檔
        assert!(memory.get("media/products/cover.png").await.is_none());
        assert_eq!(db.count_references("products/cover.webp").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_still_counts_the_migration() {
        let (memory, db) = seeded().await;
        let mut store = FailingStore::new(memory.clone());
        store.fail_delete = Some("media/products/a.jpg");

        let report = MigrateImagesJob::new(store, db.clone(), StorageLocation::new("media"))
            .run()
            .await
            .unwrap();

        assert_eq!(report.converted, 2);
        assert_eq!(report.references_updated, 4);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.errors, 1);

        assert!(memory.get("media/products/a.jpg").await.is_some());
        assert!(memory.get("media/products/a.webp").await.is_some());
        assert_eq!(db.count_references("products/a.webp").unwrap(), 2);
        assert!(memory.get("media/products/cover.png").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_read_skips_only_that_object() {
        let (memory, db) = seeded().await;
        let mut store = FailingStore::new(memory.clone());
        store.fail_read = Some("media/products/a.jpg");

        let report = MigrateImagesJob::new(store, db.clone(), StorageLocation::new("media"))
            .run()
            .await
            .unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.converted, 1);
        assert_eq!(report.errors, 1);

        assert!(memory.get("media/products/a.jpg").await.is_some());
        assert!(memory.get("media/products/a.webp").await.is_none());
        assert_eq!(db.count_references("products/a.jpg").unwrap(), 2);
        assert_eq!(db.count_references("products/cover.webp").unwrap(), 2);
    }
}
