//! Operator batch jobs. Each one is a [`Job`](crate::core::Job) run through
//! the [`JobEngine`](crate::core::engine::JobEngine) and returns its own
//! report.

pub mod backup;
pub mod fix_descriptions;
pub mod import_products;
pub mod migrate_images;
pub mod relate;
pub mod upload;

pub use backup::{BackupJob, BackupOptions, BackupReport};
pub use fix_descriptions::{FixDescriptionsJob, FixDescriptionsOptions, FixDescriptionsReport};
pub use import_products::{ImageImportOptions, ImportOptions, ImportProductsJob, ImportReport};
pub use migrate_images::{MigrateImagesJob, MigrationReport};
pub use relate::{RelateJob, RelateReport};
pub use upload::{UploadJob, UploadReport};
