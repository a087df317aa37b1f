use crate::domain::model::{ObjectInfo, PutOptions};
use crate::utils::error::Result;
use async_trait::async_trait;

/// S3-style object store: flat keys, `/` as the conventional separator.
pub trait ObjectStore: Send + Sync {
    fn list_objects(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ObjectInfo>>> + Send;
    fn read_object(&self, key: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_object(
        &self,
        key: &str,
        data: &[u8],
        options: &PutOptions,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn delete_object(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Anything that persists bare relative storage paths and can repoint them.
pub trait PathReferences: Send + Sync {
    /// Rewrites every tracked reference equal to `old_path`; returns rows changed.
    fn rewrite_path(&self, old_path: &str, new_path: &str) -> Result<usize>;
    /// Number of tracked references currently equal to `path`.
    fn count_references(&self, path: &str) -> Result<usize>;
}

/// External database dump program.
pub trait DumpTool: Send + Sync {
    fn dump(
        &self,
        target: &crate::adapters::dump::DumpTarget,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// A batch operation run by the job engine. Each job owns its report type.
#[async_trait]
pub trait Job: Send + Sync {
    type Report: std::fmt::Display + serde::Serialize + Send;

    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<Self::Report>;
}
