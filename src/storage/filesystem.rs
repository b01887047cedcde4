//! Filesystem-based storage backend

use super::traits::{AddOutcome, RevisionBackend, StorageError};
use crate::hash::ContentHash;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

/// Async-safe path existence check (avoids blocking the Tokio runtime)
async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// ENOSPC raw error code on Linux and macOS.
const ENOSPC: i32 = 28;

/// Convert an io::Error into StorageError, detecting disk-full (ENOSPC).
fn io_to_storage_error(e: std::io::Error) -> StorageError {
    if e.raw_os_error() == Some(ENOSPC) {
        StorageError::DiskFull
    } else {
        StorageError::Io(e)
    }
}

/// Atomically write data to a file using write-to-temp + fsync + rename.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Other("Cannot atomic-write to a path with no parent".into()))?
        .to_path_buf();
    let path = path.to_path_buf();
    let data = data.to_vec();

    tokio::task::spawn_blocking(move || {
        let mut tmp = NamedTempFile::new_in(&parent).map_err(io_to_storage_error)?;
        tmp.write_all(&data).map_err(io_to_storage_error)?;
        tmp.as_file().sync_all().map_err(io_to_storage_error)?;
        tmp.persist(&path)
            .map_err(|e| io_to_storage_error(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::Other(format!("spawn_blocking join failed: {}", e)))?
}

/// Filesystem storage backend
///
/// Storage layout:
/// ```text
/// {root}/
///   blobs/{hash-hex}       # Compressed full revisions
///   deltas/{hash-hex}      # Compressed delta records, keyed by target hash
/// ```
///
/// Records are immutable: an `add` against an existing file leaves it
/// untouched and reports a duplicate.
pub struct FilesystemBackend {
    /// Root directory for all data
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given root directory.
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join("blobs")).await?;
        fs::create_dir_all(root.join("deltas")).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, key: &ContentHash) -> PathBuf {
        self.root.join("blobs").join(key.to_hex())
    }

    fn delta_path(&self, key: &ContentHash) -> PathBuf {
        self.root.join("deltas").join(key.to_hex())
    }

    async fn read_record(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_record(path: &Path, data: &[u8]) -> Result<AddOutcome, StorageError> {
        if path_exists(path).await {
            debug!("Record already present: {}", path.display());
            return Ok(AddOutcome::Duplicate);
        }
        atomic_write(path, data).await?;
        Ok(AddOutcome::Stored)
    }
}

#[async_trait]
impl RevisionBackend for FilesystemBackend {
    async fn get_blob(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError> {
        Self::read_record(&self.blob_path(key)).await
    }

    async fn add_blob(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError> {
        Self::add_record(&self.blob_path(key), data).await
    }

    async fn get_delta(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError> {
        Self::read_record(&self.delta_path(key)).await
    }

    async fn add_delta(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError> {
        Self::add_record(&self.delta_path(key), data).await
    }
}
