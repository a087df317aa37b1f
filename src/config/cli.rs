use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "depoauto")]
#[command(about = "Catalog operations for the Depoauto store: images, imports, backups")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file; environment variables are used when it is absent
    #[arg(long, global = true, default_value = "depoauto.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Log process CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Print the job report as JSON on stdout")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Dump the database, zip it and store it with retention pruning
    Backup(BackupArgs),
    /// Convert every stored JPEG/PNG to WebP and repoint database references
    MigrateImages(MigrateImagesArgs),
    /// Import categories and products from a spreadsheet
    ImportProducts(ImportProductsArgs),
    /// Normalise line breaks around check marks in product descriptions
    FixDescriptions(FixDescriptionsArgs),
    /// Store local files through the WebP upload adapter
    Upload(UploadArgs),
    /// Link or unlink two products as related (both directions)
    Relate(RelateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BackupArgs {
    /// Keep the archive on this machine even when a bucket is configured
    #[arg(long)]
    pub local_only: bool,

    /// Override backup.retention_days (0 disables pruning)
    #[arg(long)]
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct MigrateImagesArgs {
    /// Keep the original files after conversion
    #[arg(long)]
    pub no_delete: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ImportProductsArgs {
    #[arg(long, default_value = "data.xlsx")]
    pub file: PathBuf,

    /// Worksheet name (first sheet by default)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Update products whose SKU already exists
    #[arg(long)]
    pub update: bool,

    /// Directory searched for per-SKU images
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Replace images of variants that already have some
    #[arg(long, requires = "images_dir")]
    pub replace_images: bool,

    /// Maximum images per SKU (0 = unlimited)
    #[arg(long, default_value_t = 10)]
    pub images_limit: usize,
}

#[derive(Debug, Clone, Args)]
pub struct FixDescriptionsArgs {
    /// Write the changes (dry-run otherwise)
    #[arg(long)]
    pub apply: bool,

    #[arg(long)]
    pub only_with_check: bool,

    /// Maximum products to examine (0 = all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Destination directory inside the storage location
    #[arg(long = "to")]
    pub dest_dir: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RelateArgs {
    pub from_sku: String,
    pub to_sku: String,

    #[arg(long, default_value_t = 0)]
    pub sort_order: i64,

    #[arg(long)]
    pub unlink: bool,
}
