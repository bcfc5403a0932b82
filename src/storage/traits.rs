//! Object store interface used by the report link resolver

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

use super::types::AccessReference;

/// Object store able to issue time-limited read references
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check if an object exists
    ///
    /// A missing object is `Ok(false)`, not an error.
    async fn object_exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Issue a presigned GET reference valid for `expires_in`
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<AccessReference, StorageError>;
}
