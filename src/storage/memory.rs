//! In-memory storage backend

use super::traits::{AddOutcome, RevisionBackend, StorageError};
use crate::hash::ContentHash;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory backend for tests and embedded use.
///
/// Both tables live in concurrent maps; `add` resolves the
/// insert-vs-duplicate race atomically through the entry API.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: DashMap<ContentHash, Bytes>,
    deltas: DashMap<ContentHash, Bytes>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blob records held.
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Number of delta records held.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    fn add(map: &DashMap<ContentHash, Bytes>, data: &[u8], key: &ContentHash) -> AddOutcome {
        match map.entry(*key) {
            Entry::Occupied(_) => AddOutcome::Duplicate,
            Entry::Vacant(entry) => {
                entry.insert(Bytes::copy_from_slice(data));
                AddOutcome::Stored
            }
        }
    }
}

#[async_trait]
impl RevisionBackend for MemoryBackend {
    async fn get_blob(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(key).map(|entry| entry.to_vec()))
    }

    async fn add_blob(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError> {
        Ok(Self::add(&self.blobs, data, key))
    }

    async fn get_delta(&self, key: &ContentHash) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.deltas.get(key).map(|entry| entry.to_vec()))
    }

    async fn add_delta(&self, data: &[u8], key: &ContentHash) -> Result<AddOutcome, StorageError> {
        Ok(Self::add(&self.deltas, data, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_what_add_stored() {
        let backend = MemoryBackend::new();
        let key = ContentHash::digest("rev");
        assert_eq!(backend.get_blob(&key).await.unwrap(), None);

        let outcome = backend.add_blob(b"payload", &key).await.unwrap();
        assert_eq!(outcome, AddOutcome::Stored);
        assert_eq!(
            backend.get_blob(&key).await.unwrap(),
            Some(b"payload".to_vec())
        );
    }

    #[tokio::test]
    async fn test_duplicate_add_keeps_first_record() {
        let backend = MemoryBackend::new();
        let key = ContentHash::digest("rev");
        backend.add_delta(b"first", &key).await.unwrap();

        let outcome = backend.add_delta(b"second", &key).await.unwrap();
        assert_eq!(outcome, AddOutcome::Duplicate);
        assert_eq!(
            backend.get_delta(&key).await.unwrap(),
            Some(b"first".to_vec())
        );
    }

    #[tokio::test]
    async fn test_tables_are_disjoint() {
        let backend = MemoryBackend::new();
        let key = ContentHash::digest("rev");
        backend.add_blob(b"blob", &key).await.unwrap();
        assert_eq!(backend.get_delta(&key).await.unwrap(), None);
        assert_eq!(backend.blob_count(), 1);
        assert_eq!(backend.delta_count(), 0);
    }
}
