//! Object store capability.
//!
//! The remote collection is consumed through a narrow seam: paginated key
//! enumeration plus whole-object retrieval. Failure modes matter to the
//! driver: a failed `get` is caught and the candidate skipped, while a
//! failed `list_page` terminates the run (the candidate stream itself is
//! gone).

#[cfg(feature = "s3")]
mod s3;

mod memory;

pub use memory::MemoryObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Reference to one remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub key: String,
    pub size: Option<i64>,
}

/// One page of an enumeration, with the token for the next page.
///
/// `continuation: None` means the source is exhausted. A page may carry an
/// empty object list while enumeration continues.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectRef>,
    pub continuation: Option<String>,
}

/// Paginated listing and byte retrieval over a remote object collection.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of object references under `prefix`.
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage>;

    /// Retrieve an object's full byte payload.
    async fn get(&self, key: &str) -> Result<Bytes>;
}
