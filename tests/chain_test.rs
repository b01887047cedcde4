//! Delta chain length enforcement
//!
//! Reconstruction cost is bounded at write time: once a base revision sits
//! at the maximum chain depth, the next dependent write becomes a full blob
//! and starts a fresh chain.

mod common;

use common::{edit_line, generate_source, store_over};
use revstore::{BlobStore, ContentHash, MemoryBackend, SetOutcome, StoreConfig};
use std::sync::Arc;

#[tokio::test]
async fn test_chain_capped_at_fifty_hops() {
    let store = store_over(Arc::new(MemoryBackend::new()));

    let mut revisions = vec![generate_source(60, 20)];
    for i in 1..=51 {
        let next = edit_line(&revisions[i - 1], 30, i);
        revisions.push(next);
    }
    let hashes: Vec<ContentHash> = revisions.iter().map(|r| ContentHash::digest(r)).collect();

    store.set(&hashes[0], &revisions[0], None).await.unwrap();
    for i in 1..=50 {
        let outcome = store
            .set(&hashes[i], &revisions[i], Some(&hashes[i - 1]))
            .await
            .unwrap();
        assert!(
            matches!(outcome, SetOutcome::Delta { .. }),
            "write {} should still fit under the chain cap, got {:?}",
            i,
            outcome
        );
    }

    // The 51st dependent write would need a 51-hop chain; it must be a blob.
    let outcome = store
        .set(&hashes[51], &revisions[51], Some(&hashes[50]))
        .await
        .unwrap();
    assert!(
        matches!(outcome, SetOutcome::Blob { .. }),
        "51st dependent write should fall back to a full blob, got {:?}",
        outcome
    );

    assert_eq!(store.chain_depth(&hashes[50]).await.unwrap(), 50);
    assert_eq!(store.chain_depth(&hashes[51]).await.unwrap(), 0);

    // Every revision along the chain reconstructs exactly.
    assert_eq!(
        store.get(&hashes[51]).await.unwrap().as_deref(),
        Some(revisions[51].as_str())
    );
    assert_eq!(
        store.get(&hashes[50]).await.unwrap().as_deref(),
        Some(revisions[50].as_str())
    );
    assert_eq!(
        store.get(&hashes[25]).await.unwrap().as_deref(),
        Some(revisions[25].as_str())
    );
    assert_eq!(
        store.get(&hashes[0]).await.unwrap().as_deref(),
        Some(revisions[0].as_str())
    );
}

#[tokio::test]
async fn test_configured_cap_starts_fresh_chain() {
    let config = StoreConfig {
        max_chain_depth: 3,
        ..StoreConfig::default()
    };
    let store = BlobStore::new(Arc::new(MemoryBackend::new()), &config);

    let mut revisions = vec![generate_source(60, 21)];
    for i in 1..=4 {
        let next = edit_line(&revisions[i - 1], 30, i);
        revisions.push(next);
    }
    let hashes: Vec<ContentHash> = revisions.iter().map(|r| ContentHash::digest(r)).collect();

    store.set(&hashes[0], &revisions[0], None).await.unwrap();
    let mut outcomes = Vec::new();
    for i in 1..=4 {
        outcomes.push(
            store
                .set(&hashes[i], &revisions[i], Some(&hashes[i - 1]))
                .await
                .unwrap(),
        );
    }

    assert!(matches!(outcomes[0], SetOutcome::Delta { .. }));
    assert!(matches!(outcomes[1], SetOutcome::Delta { .. }));
    assert!(matches!(outcomes[2], SetOutcome::Delta { .. }));
    assert!(
        matches!(outcomes[3], SetOutcome::Blob { .. }),
        "write past the cap should be a blob, got {:?}",
        outcomes[3]
    );

    // The fresh blob anchors a new chain.
    let next = edit_line(&revisions[4], 30, 99);
    let next_hash = ContentHash::digest(&next);
    let outcome = store.set(&next_hash, &next, Some(&hashes[4])).await.unwrap();
    assert!(matches!(outcome, SetOutcome::Delta { .. }));
    assert_eq!(store.chain_depth(&next_hash).await.unwrap(), 1);
}

#[tokio::test]
async fn test_depth_survives_cold_chain_cache() {
    // A second instance has an empty depth memo; the walk over stored
    // delta headers must yield the same answer.
    let backend = Arc::new(MemoryBackend::new());
    let writer = store_over(backend.clone());

    let mut revisions = vec![generate_source(60, 22)];
    for i in 1..=5 {
        let next = edit_line(&revisions[i - 1], 30, i);
        revisions.push(next);
    }
    let hashes: Vec<ContentHash> = revisions.iter().map(|r| ContentHash::digest(r)).collect();
    writer.set(&hashes[0], &revisions[0], None).await.unwrap();
    for i in 1..=5 {
        writer
            .set(&hashes[i], &revisions[i], Some(&hashes[i - 1]))
            .await
            .unwrap();
    }

    let reader = store_over(backend);
    assert_eq!(reader.chain_depth(&hashes[5]).await.unwrap(), 5);
    assert_eq!(reader.chain_depth(&hashes[0]).await.unwrap(), 0);
}
