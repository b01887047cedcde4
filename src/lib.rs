//! revstore - content-addressed blob storage with delta compression
//!
//! Persists successive revisions of text compactly: each revision is stored
//! either as a complete deflate-compressed blob or as a compact binary delta
//! against a previously stored base revision, keyed by an externally
//! supplied content hash. A bloom filter accelerates the delta/blob routing
//! decision on reads, and delta chains are capped at write time so
//! reconstruction cost stays bounded.

pub mod bloom;
pub mod chain;
pub mod codec;
pub mod compress;
pub mod config;
pub mod estimator;
pub mod hash;
pub mod storage;
pub mod store;

pub use bloom::{BloomError, BloomFilter};
pub use chain::ChainLengthCache;
pub use codec::{CodecError, DeltaCodec, DeltaOp, DeltaPayload};
pub use config::{ConfigError, StoreConfig};
pub use estimator::ChangeEstimator;
pub use hash::{ContentHash, HashError, HASH_LEN};
pub use storage::{AddOutcome, FilesystemBackend, MemoryBackend, RevisionBackend, StorageError};
pub use store::{BlobStore, DynStore, SetOutcome, StoreError};
