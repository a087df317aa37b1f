pub mod convert;
pub mod engine;
pub mod paths;
pub mod slug;
pub mod text;

pub use crate::domain::model::{ObjectInfo, PutOptions};
pub use crate::domain::ports::{DumpTool, Job, ObjectStore, PathReferences};
pub use crate::utils::error::Result;
