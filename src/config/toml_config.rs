use crate::adapters::dump::DumpTarget;
use crate::adapters::storage::{ConfiguredStore, LocalStorage, MediaUrls};
use crate::core::paths::StorageLocation;
use crate::utils::error::{OpsError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://depoauto.db";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_BACKUP_PREFIX: &str = "db-backups/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: String,
    /// Key prefix shared by every stored file (e.g. `media`).
    pub location: String,
    pub local_root: PathBuf,
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            bucket: None,
            endpoint: None,
            region: DEFAULT_REGION.to_string(),
            location: String::new(),
            local_root: PathBuf::from("./media"),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Falls back to `storage.bucket` when unset.
    pub bucket: Option<String>,
    pub prefix: String,
    pub retention_days: u32,
    pub local_dir: PathBuf,
    pub file_prefix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: DEFAULT_BACKUP_PREFIX.to_string(),
            retention_days: 30,
            local_dir: PathBuf::from("backups"),
            file_prefix: "depoauto".to_string(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${DATABASE_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OpsError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 只用環境變數建立配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment fallbacks resolved through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| non_empty(lookup(key));
        let mut config = Self::default();

        if let Some(url) = var("DATABASE_URL") {
            config.database.url = url;
        }

        if var("USE_S3").is_some_and(|v| is_truthy(&v)) {
            config.storage.backend = StorageBackend::S3;
        }
        config.storage.bucket = var("AWS_STORAGE_BUCKET_NAME");
        config.storage.endpoint = var("AWS_S3_ENDPOINT_URL");
        if let Some(region) = var("AWS_S3_REGION_NAME").or_else(|| var("AWS_DEFAULT_REGION")) {
            config.storage.region = region;
        }
        if let Some(location) = var("AWS_LOCATION") {
            config.storage.location = location;
        }
        if let Some(root) = var("MEDIA_ROOT") {
            config.storage.local_root = PathBuf::from(root);
        }
        config.storage.public_base_url = var("MEDIA_URL");

        config.backup.bucket = var("BACKUP_S3_BUCKET");
        if let Some(prefix) = var("BACKUP_S3_PREFIX") {
            config.backup.prefix = prefix;
        }
        if let Some(days) = var("BACKUP_RETENTION_DAYS") {
            match days.parse() {
                Ok(days) => config.backup.retention_days = days,
                Err(_) => tracing::warn!(
                    "⚠️ Ignoring invalid BACKUP_RETENTION_DAYS '{}', using {}",
                    days,
                    config.backup.retention_days
                ),
            }
        }
        if let Some(dir) = var("BACKUP_LOCAL_DIR") {
            config.backup.local_dir = PathBuf::from(dir);
        }

        config
    }

    /// File when it exists, environment otherwise. Always validated.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.is_file() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(path)?
        } else {
            tracing::debug!(
                "No configuration file at {}, using environment",
                path.display()
            );
            Self::from_env()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn dump_target(&self) -> Result<DumpTarget> {
        DumpTarget::from_database_url(&self.database.url)
    }

    /// Path of the SQLite catalog; other databases are not supported here.
    pub fn catalog_path(&self) -> Result<PathBuf> {
        match self.dump_target()? {
            DumpTarget::Sqlite { path } => Ok(path),
            other => Err(OpsError::InvalidConfigValueError {
                field: "database.url".to_string(),
                value: other.describe(),
                reason: "the catalog database must be SQLite".to_string(),
            }),
        }
    }

    pub fn storage_location(&self) -> StorageLocation {
        StorageLocation::new(&self.storage.location)
    }

    pub fn backup_bucket(&self) -> Option<&str> {
        self.backup
            .bucket
            .as_deref()
            .or(self.storage.bucket.as_deref())
            .filter(|b| !b.is_empty())
    }

    pub fn backup_location(&self) -> StorageLocation {
        StorageLocation::new(&self.backup.prefix)
    }

    /// Public base URL for stored files, without the location prefix.
    pub fn media_base_url(&self) -> String {
        if let Some(url) = self.storage.public_base_url.as_deref() {
            return url.to_string();
        }
        match (self.storage.backend, self.storage.bucket.as_deref()) {
            (StorageBackend::S3, Some(bucket)) => match self.storage.endpoint.as_deref() {
                Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                None => format!(
                    "https://{}.s3.{}.amazonaws.com",
                    bucket, self.storage.region
                ),
            },
            _ => "/media".to_string(),
        }
    }

    pub fn media_urls(&self) -> MediaUrls {
        MediaUrls::new(&self.media_base_url(), self.storage_location())
    }

    /// Object store for media files.
    pub async fn media_store(&self) -> Result<ConfiguredStore> {
        match self.storage.backend {
            StorageBackend::Local => Ok(ConfiguredStore::Local(LocalStorage::new(
                &self.storage.local_root,
            ))),
            StorageBackend::S3 => {
                let bucket = validation::validate_required_field("storage.bucket", &self.storage.bucket)?;
                self.s3_store(bucket).await
            }
        }
    }

    /// Object store holding database backups, when a backup bucket is configured.
    pub async fn backup_store(&self) -> Result<Option<ConfiguredStore>> {
        match self.backup_bucket() {
            Some(bucket) => Ok(Some(self.s3_store(bucket).await?)),
            None => Ok(None),
        }
    }

    #[cfg(feature = "s3")]
    async fn s3_store(&self, bucket: &str) -> Result<ConfiguredStore> {
        use crate::adapters::storage::S3Storage;
        let storage = S3Storage::connect(
            bucket,
            &self.storage.region,
            self.storage.endpoint.as_deref(),
        )
        .await;
        Ok(ConfiguredStore::S3(storage))
    }

    #[cfg(not(feature = "s3"))]
    async fn s3_store(&self, bucket: &str) -> Result<ConfiguredStore> {
        Err(OpsError::config(format!(
            "bucket '{}' is configured but this build has no S3 support (enable the 's3' feature)",
            bucket
        )))
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("database.url", &self.database.url)?;
        self.dump_target()?;

        if self.storage.backend == StorageBackend::S3 {
            let bucket = validation::validate_required_field("storage.bucket", &self.storage.bucket)?;
            validation::validate_s3_bucket_name("storage.bucket", bucket)?;
        }
        validation::validate_aws_region("storage.region", &self.storage.region)?;
        if let Some(endpoint) = self.storage.endpoint.as_deref() {
            validation::validate_url("storage.endpoint", endpoint)?;
        }
        validation::validate_path(
            "storage.local_root",
            &self.storage.local_root.to_string_lossy(),
        )?;

        if let Some(bucket) = self.backup.bucket.as_deref() {
            validation::validate_s3_bucket_name("backup.bucket", bucket)?;
        }
        validation::validate_range("backup.retention_days", self.backup.retention_days, 0, 3650)?;
        validation::validate_path("backup.local_dir", &self.backup.local_dir.to_string_lossy())?;
        validation::validate_non_empty_string("backup.file_prefix", &self.backup.file_prefix)?;
        if self.backup.file_prefix.contains('/') {
            return Err(OpsError::InvalidConfigValueError {
                field: "backup.file_prefix".to_string(),
                value: self.backup.file_prefix.clone(),
                reason: "must not contain '/'".to_string(),
            });
        }

        Ok(())
    }
}
