use clap::Parser;
use depoauto_ops::adapters::dump::CommandDumper;
use depoauto_ops::app::jobs::backup::BackupBucket;
use depoauto_ops::app::jobs::{
    BackupJob, BackupOptions, FixDescriptionsJob, FixDescriptionsOptions, ImageImportOptions,
    ImportOptions, ImportProductsJob, MigrateImagesJob, RelateJob, UploadJob,
};
use depoauto_ops::core::Job;
use depoauto_ops::utils::{logger, validation};
use depoauto_ops::{
    AppConfig, CatalogDb, Cli, Command, ConfiguredStore, JobEngine, Result, WebpStorage,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = dispatch(&cli).await {
        tracing::error!(
            "❌ depoauto failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        // 輸出用戶友好的錯誤信息
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        std::process::exit(e.severity().exit_code());
    }

    Ok(())
}

async fn run_job<J: Job>(job: J, cli: &Cli) -> Result<()> {
    let engine = JobEngine::new_with_monitoring(job, cli.monitor);
    let report = engine.run().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("✅ {}", report);
    }
    Ok(())
}

fn open_catalog(config: &AppConfig) -> Result<Arc<CatalogDb>> {
    let path = config.catalog_path()?;
    tracing::debug!("🗄️ Catalog database: {}", path.display());
    Ok(Arc::new(CatalogDb::open(&path)?))
}

async fn dispatch(cli: &Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    match &cli.command {
        Command::Backup(args) => {
            let retention_days = args.retention_days.unwrap_or(config.backup.retention_days);
            validation::validate_range("--retention-days", retention_days, 0, 3650)?;

            let options = BackupOptions {
                local_only: args.local_only,
                retention_days,
                file_prefix: config.backup.file_prefix.clone(),
                local_dir: config.backup.local_dir.clone(),
            };
            let mut job: BackupJob<CommandDumper, ConfiguredStore> =
                BackupJob::new(CommandDumper::default(), config.dump_target()?, options);

            if !args.local_only {
                if let (Some(name), Some(store)) =
                    (config.backup_bucket(), config.backup_store().await?)
                {
                    job = job.with_bucket(BackupBucket {
                        store,
                        location: config.backup_location(),
                        label: format!("s3://{}", name),
                    });
                }
            }
            run_job(job, cli).await
        }
        Command::MigrateImages(args) => {
            let db = open_catalog(&config)?;
            let store = config.media_store().await?;
            let job = MigrateImagesJob::new(store, db, config.storage_location())
                .delete_originals(!args.no_delete);
            run_job(job, cli).await
        }
        Command::ImportProducts(args) => {
            let db = open_catalog(&config)?;
            let storage = WebpStorage::new(config.media_store().await?, config.storage_location());
            let options = ImportOptions {
                file: args.file.clone(),
                sheet: args.sheet.clone(),
                update_existing: args.update,
                images: args.images_dir.as_ref().map(|dir| ImageImportOptions {
                    dir: dir.clone(),
                    replace: args.replace_images,
                    limit: args.images_limit,
                }),
            };
            run_job(ImportProductsJob::new(db, storage, options), cli).await
        }
        Command::FixDescriptions(args) => {
            let db = open_catalog(&config)?;
            let options = FixDescriptionsOptions {
                apply: args.apply,
                only_with_check: args.only_with_check,
                limit: args.limit,
            };
            run_job(FixDescriptionsJob::new(db, options), cli).await
        }
        Command::Upload(args) => {
            let storage = WebpStorage::new(config.media_store().await?, config.storage_location());
            let job = UploadJob::new(storage, args.files.clone(), args.dest_dir.clone());
            run_job(job, cli).await
        }
        Command::Relate(args) => {
            let db = open_catalog(&config)?;
            let job = if args.unlink {
                RelateJob::unlink(db, &args.from_sku, &args.to_sku)
            } else {
                RelateJob::link(db, &args.from_sku, &args.to_sku, args.sort_order)
            };
            run_job(job, cli).await
        }
    }
}
