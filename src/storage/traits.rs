//! Storage backend trait definitions

use crate::hash::ContentHash;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Disk full")]
    DiskFull,

    #[error("Storage error: {0}")]
    Other(String),
}

/// Result of an `add`: either the record was written, or an identical key
/// already existed. Duplicates are expected under content addressing and
/// are never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Stored,
    Duplicate,
}

/// Backing key-value store for revision records.
///
/// Exposes one logical table each for blob and delta records. Keys are
/// content hashes; values are opaque compressed bytes. Implementations only
/// ever insert — records are immutable and never rewritten, so a duplicate
/// `add` must leave the existing record untouched and report
/// [`AddOutcome::Duplicate`].
///
/// This trait is object-safe and can be used with `Box<dyn RevisionBackend>`.
#[async_trait]
pub trait RevisionBackend: Send + Sync {
    /// Fetch a blob record, or `None` if the key is absent.
    async fn get_blob(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert a blob record unless the key already exists.
    async fn add_blob(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError>;

    /// Fetch a delta record, or `None` if the key is absent.
    async fn get_delta(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert a delta record unless the key already exists.
    async fn add_delta(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError>;
}

/// Blanket implementation for boxed trait objects, enabling dynamic dispatch
#[async_trait]
impl RevisionBackend for Box<dyn RevisionBackend> {
    async fn get_blob(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get_blob(key).await
    }

    async fn add_blob(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError> {
        (**self).add_blob(data, key).await
    }

    async fn get_delta(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get_delta(key).await
    }

    async fn add_delta(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError> {
        (**self).add_delta(data, key).await
    }
}
