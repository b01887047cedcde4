//! Shared test infrastructure for integration tests
//!
//! Provides store constructors over the in-memory backend and seeded
//! source-code-like revision generators.

#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use revstore::{BlobStore, MemoryBackend, StoreConfig};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Route store logs through the test harness when RUST_LOG is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a store over a fresh in-memory backend.
pub fn memory_store() -> BlobStore<MemoryBackend> {
    store_over(Arc::new(MemoryBackend::new()))
}

/// Build a store over an existing backend (for cold-start scenarios where
/// a second instance opens records written by the first).
pub fn store_over(backend: Arc<MemoryBackend>) -> BlobStore<MemoryBackend> {
    init_tracing();
    BlobStore::new(backend, &StoreConfig::default())
}

/// Generate a deterministic source-file-like revision of `lines` lines.
pub fn generate_source(lines: usize, seed: u64) -> String {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..lines)
        .map(|i| {
            format!(
                "let v{} = shape({}, {}); canvas.draw(v{});\n",
                i,
                rng.gen_range(0..1000),
                rng.gen_range(0..1000),
                i
            )
        })
        .collect()
}

/// Replace one line of `text`, tagging the replacement so successive edits
/// stay distinct. Mimics the common editor case of a localized change.
pub fn edit_line(text: &str, line_idx: usize, tag: usize) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == line_idx {
                format!("let edited_{} = shape(0, 0); canvas.draw(edited_{});\n", tag, tag)
            } else {
                format!("{}\n", line)
            }
        })
        .collect()
}
