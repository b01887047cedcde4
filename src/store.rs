//! Blob store - main orchestrator for delta-based revision storage
//!
//! Persists each revision either as a complete compressed blob or as a
//! compressed binary delta against a previously stored base revision. A
//! bloom filter over delta keys short-circuits the blob-vs-delta routing on
//! reads; a bounded depth memo keeps write-time chain walks cheap.

use crate::bloom::BloomFilter;
use crate::chain::ChainLengthCache;
use crate::codec::{CodecError, DeltaCodec, DeltaOp};
use crate::compress;
use crate::config::StoreConfig;
use crate::estimator::ChangeEstimator;
use crate::hash::{ContentHash, HASH_LEN};
use crate::storage::{AddOutcome, RevisionBackend, StorageError};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Errors from the blob store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to decompress stored record: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("Stored blob is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Revision too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },
}

/// What `set` physically wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Stored as a complete compressed blob.
    Blob { stored_size: u64 },

    /// Stored as a compressed delta against the requested base.
    Delta { stored_size: u64 },

    /// The requested base could not be resolved; nothing was stored.
    Dropped,
}

/// Content-addressed revision store, generic over the backing key-value
/// collaborator.
///
/// All mutable state (bloom filter, chain-depth memo) is instance-held and
/// built at construction. Records are immutable once written, so reads never
/// race writes of the same key and duplicate writes are safely discarded.
pub struct BlobStore<S: RevisionBackend> {
    storage: Arc<S>,
    codec: DeltaCodec,
    estimator: ChangeEstimator,
    /// Which hashes are (probably) stored as deltas. Positive answers are
    /// only a routing hint; negative answers are definitive.
    delta_index: Mutex<BloomFilter>,
    chain_cache: ChainLengthCache,
    delta_threshold: f64,
    max_chain_depth: u32,
    max_object_size: u64,
}

/// Type alias for a store with dynamic backend dispatch
pub type DynStore = BlobStore<Box<dyn RevisionBackend>>;

impl<S: RevisionBackend> BlobStore<S> {
    /// Create a store over the given backend.
    pub fn new(storage: Arc<S>, config: &StoreConfig) -> Self {
        Self {
            storage,
            codec: DeltaCodec::new(config.max_object_size as usize),
            estimator: ChangeEstimator::new(config.scan_window),
            delta_index: Mutex::new(BloomFilter::with_target_error(
                config.bloom_capacity,
                config.bloom_error,
            )),
            chain_cache: ChainLengthCache::new(config.chain_cache_entries),
            delta_threshold: config.delta_threshold,
            max_chain_depth: config.max_chain_depth,
            max_object_size: config.max_object_size,
        }
    }

    /// Access the underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Retrieve a revision, reconstructing through its delta chain if
    /// necessary. `Ok(None)` means no record exists for `hash`.
    #[instrument(skip(self))]
    pub async fn get(&self, hash: &ContentHash) -> Result<Option<String>, StoreError> {
        // Decoded op-lists pile up here while the loop walks base hashes
        // toward a full blob, then apply in reverse.
        let mut pending: Vec<Vec<DeltaOp>> = Vec::new();
        let mut current = *hash;

        loop {
            let probably_delta = self.delta_index.lock().contains(&current.to_hex());

            if !probably_delta {
                if let Some(record) = self.storage.get_blob(&current).await? {
                    let text = decode_blob(&record)?;
                    return Ok(Some(self.apply_pending(pending, text)?));
                }
            }

            match self.storage.get_delta(&current).await? {
                Some(record) => {
                    if !probably_delta {
                        // A fresh instance starts with an empty filter;
                        // record what the table just proved.
                        debug!("Backfilling delta index for {}", current.short());
                        self.delta_index.lock().add(&current.to_hex());
                    }
                    let raw = compress::inflate(&record).map_err(StoreError::Decompress)?;
                    let payload = self.codec.decode(&raw)?;
                    pending.push(payload.ops);
                    current = payload.base;
                }
                None => {
                    // Filter said delta, table disagreed: false positive.
                    // The blob table is still authoritative.
                    if probably_delta {
                        if let Some(record) = self.storage.get_blob(&current).await? {
                            let text = decode_blob(&record)?;
                            return Ok(Some(self.apply_pending(pending, text)?));
                        }
                    }
                    if pending.is_empty() {
                        debug!("No record for {}", current.short());
                    } else {
                        warn!(
                            "Unresolvable base {} while reconstructing {} ({} hops deep)",
                            current.short(),
                            hash.short(),
                            pending.len()
                        );
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Store a revision. With no base it becomes a full blob; with a base it
    /// becomes a delta when the chain cap and change estimate allow,
    /// otherwise a full blob. A duplicate key is a no-op.
    #[instrument(skip(self, value))]
    pub async fn set(
        &self,
        hash: &ContentHash,
        value: &str,
        base: Option<&ContentHash>,
    ) -> Result<SetOutcome, StoreError> {
        if value.len() as u64 > self.max_object_size {
            return Err(StoreError::TooLarge {
                size: value.len() as u64,
                max: self.max_object_size,
            });
        }
        match base {
            None => self.set_blob(hash, value).await,
            Some(base) => self.set_with_base(hash, value, base).await,
        }
    }

    /// Number of delta hops from `hash` back to the nearest full blob.
    ///
    /// 0 when no delta record exists for `hash` (full blob or absent). The
    /// walk reads only the base-hash header of each stored delta and
    /// memoizes every hop on the way back out.
    pub async fn chain_depth(&self, hash: &ContentHash) -> Result<u32, StoreError> {
        let mut walked: Vec<ContentHash> = Vec::new();
        let mut current = *hash;

        let mut depth = loop {
            if let Some(depth) = self.chain_cache.get(&current) {
                break depth;
            }
            match self.storage.get_delta(&current).await? {
                None => break 0,
                Some(record) => {
                    let head = compress::inflate_prefix(&record, HASH_LEN)
                        .map_err(StoreError::Decompress)?;
                    let base = ContentHash::from_bytes(&head)
                        .map_err(|e| StoreError::Codec(CodecError::Header(e)))?;
                    walked.push(current);
                    current = base;
                }
            }
        };

        for hop in walked.into_iter().rev() {
            depth += 1;
            self.chain_cache.put(hop, depth);
        }
        Ok(depth)
    }

    async fn set_blob(&self, hash: &ContentHash, value: &str) -> Result<SetOutcome, StoreError> {
        let record = compress::deflate(value.as_bytes());
        let stored_size = record.len() as u64;
        match self.storage.add_blob(&record, hash).await? {
            AddOutcome::Stored => info!(
                "Stored blob {} ({} -> {} bytes)",
                hash.short(),
                value.len(),
                stored_size
            ),
            AddOutcome::Duplicate => debug!("Blob {} already present", hash.short()),
        }
        Ok(SetOutcome::Blob { stored_size })
    }

    async fn set_with_base(
        &self,
        hash: &ContentHash,
        value: &str,
        base: &ContentHash,
    ) -> Result<SetOutcome, StoreError> {
        let Some(base_text) = self.get(base).await? else {
            // Nothing is stored in this case: the caller asked for a delta
            // against content this store cannot produce.
            error!(
                "Base {} unresolved, dropping write for {}",
                base.short(),
                hash.short()
            );
            return Ok(SetOutcome::Dropped);
        };

        let depth = self.chain_depth(base).await?;
        let estimate = self.estimator.estimate(&base_text, value);
        if depth >= self.max_chain_depth || estimate > self.delta_threshold {
            debug!(
                "Storing {} as full blob (base chain depth {}, change estimate {:.2})",
                hash.short(),
                depth,
                estimate
            );
            return self.set_blob(hash, value).await;
        }

        let delta = self.codec.encode(base, &base_text, value)?;
        let record = compress::deflate(&delta);
        let stored_size = record.len() as u64;
        match self.storage.add_delta(&record, hash).await? {
            AddOutcome::Stored => info!(
                "Stored delta {} against {} ({} bytes, ratio {:.2})",
                hash.short(),
                base.short(),
                stored_size,
                DeltaCodec::compression_ratio(value.len(), delta.len())
            ),
            AddOutcome::Duplicate => debug!("Delta {} already present", hash.short()),
        }
        self.delta_index.lock().add(&hash.to_hex());
        self.chain_cache.put(*hash, depth + 1);
        Ok(SetOutcome::Delta { stored_size })
    }

    fn apply_pending(
        &self,
        pending: Vec<Vec<DeltaOp>>,
        base: String,
    ) -> Result<String, StoreError> {
        let mut text = base;
        for ops in pending.into_iter().rev() {
            text = self.codec.reconstruct(&ops, &text)?;
        }
        Ok(text)
    }
}

fn decode_blob(record: &[u8]) -> Result<String, StoreError> {
    let raw = compress::inflate(record).map_err(StoreError::Decompress)?;
    Ok(String::from_utf8(raw)?)
}
