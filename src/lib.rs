pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod db;
pub mod domain;
pub mod utils;

pub use adapters::storage::{ConfiguredStore, LocalStorage, MediaUrls, MemoryStorage, WebpStorage};
#[cfg(feature = "s3")]
pub use adapters::storage::S3Storage;
pub use config::AppConfig;
#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use core::engine::JobEngine;
pub use db::CatalogDb;
pub use utils::error::{OpsError, Result};
