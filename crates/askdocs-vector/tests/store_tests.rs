use askdocs_core::filter::{FilterValue, SearchFilter};
use askdocs_core::traits::{DocumentStore, SequentialStore, VectorStore};
use askdocs_core::types::{point_id, Chunk, ChunkMetadata, IndexedPoint, Meta, Payload, PreparedChunk, SparseVector};
use askdocs_vector::{LanceStore, MemoryStore};
use tempfile::TempDir;

const DIM: usize = 4;

fn point(source: &str, idx: usize, text: &str, dense: [f32; DIM], sparse: &[(u32, f32)]) -> IndexedPoint {
    let mut extra = Meta::new();
    extra.insert("category".into(), if source.starts_with('p') { "plumbing" } else { "power" }.into());
    let chunk = Chunk {
        text: text.into(),
        metadata: ChunkMetadata { source: source.into(), chunk_index: idx, total_chunks: 3, extra },
    };
    IndexedPoint {
        id: point_id(source, idx),
        dense: dense.to_vec(),
        sparse: SparseVector::from_weights(sparse.iter().copied()),
        payload: Payload::from_prepared(&PreparedChunk::plain(chunk)),
    }
}

fn corpus() -> Vec<IndexedPoint> {
    vec![
        point("pump.txt", 0, "prime the pump", [1.0, 0.0, 0.0, 0.0], &[(1, 1.0), (2, 1.0)]),
        point("pump.txt", 1, "replace the seal", [0.0, 1.0, 0.0, 0.0], &[(3, 1.0)]),
        point("solar.txt", 0, "clean the panels", [0.0, 0.0, 1.0, 0.0], &[(4, 1.0), (1, 0.5)]),
    ]
}

fn exercise_store(store: &dyn DocumentStore) {
    assert_eq!(store.upsert(&corpus()).unwrap(), 3);
    assert_eq!(store.len().unwrap(), 3);

    let dense = store.search_dense(&[0.9, 0.1, 0.0, 0.0], None, 2).unwrap();
    assert_eq!(dense.len(), 2);
    assert_eq!(dense[0].id, point_id("pump.txt", 0));
    assert_eq!(dense[1].id, point_id("pump.txt", 1));
    assert!(dense[0].score >= dense[1].score);

    let sparse = store.search_sparse(&SparseVector::from_weights([(1, 1.0)]), None, 5).unwrap();
    assert_eq!(sparse[0].id, point_id("pump.txt", 0));
    assert_eq!(sparse[1].id, point_id("solar.txt", 0));

    let only_power = SearchFilter::new().with("category", "power").compile().unwrap();
    let filtered = store.search_dense(&[1.0, 0.0, 0.0, 0.0], Some(&only_power), 5).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].payload.source, "solar.txt");

    let by_source = SearchFilter::new()
        .with("source", FilterValue::any_of(["pump.txt"]))
        .compile()
        .unwrap();
    let filtered = store.search_sparse(&SparseVector::from_weights([(1, 1.0)]), Some(&by_source), 5).unwrap();
    assert!(filtered.iter().all(|c| c.payload.source == "pump.txt"));

    let second_chunk = SearchFilter::new().with("chunk_index", "1").compile().unwrap();
    let filtered = store.search_dense(&[1.0, 0.0, 0.0, 0.0], Some(&second_chunk), 5).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, point_id("pump.txt", 1));

    // total_chunks has no column of its own, so it is matched against the payload.
    let mixed = SearchFilter::new()
        .with("category", "plumbing")
        .with("total_chunks", 3i64)
        .compile()
        .unwrap();
    let filtered = store.search_dense(&[0.0, 0.0, 1.0, 0.0], Some(&mixed), 5).unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|c| c.payload.source == "pump.txt"));
    let none = SearchFilter::new().with("total_chunks", 4i64).compile().unwrap();
    assert!(store.search_sparse(&SparseVector::from_weights([(1, 1.0)]), Some(&none), 5).unwrap().is_empty());

    // Re-upserting the same ids replaces rows and keeps their seq.
    let seq_before = dense[1].seq.expect("seq assigned");
    let mut again = corpus();
    again[1] = point("pump.txt", 1, "replace the shaft seal", [0.0, 1.0, 0.0, 0.0], &[(3, 1.0)]);
    store.upsert(&again).unwrap();
    assert_eq!(store.len().unwrap(), 3);
    let hit = store.search_dense(&[0.0, 1.0, 0.0, 0.0], None, 1).unwrap();
    assert_eq!(hit[0].payload.display_text, "replace the shaft seal");
    assert_eq!(hit[0].seq, Some(seq_before));

    let records = store.fetch_by_seq(&[3, 1, 2, 2, 99]).unwrap();
    let seqs: Vec<u64> = records.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(records[0].content, "prime the pump");
    assert_eq!(records[1].content, "replace the shaft seal");
    assert_eq!(records[2].source, "solar.txt");
}

#[test]
fn memory_store_upsert_search_and_fetch() {
    exercise_store(&MemoryStore::new());
}

#[test]
fn lance_store_upsert_search_and_fetch() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "chunks_test", DIM).expect("open");
    exercise_store(&store);
}

#[test]
fn lance_store_keeps_seq_across_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let store = LanceStore::open(tmp.path(), "chunks", DIM).expect("open");
        store.upsert(&corpus()[..2]).unwrap();
    }
    let store = LanceStore::open(tmp.path(), "chunks", DIM).expect("reopen");
    store.upsert(&corpus()[2..]).unwrap();
    let records = store.fetch_by_seq(&[1, 2, 3]).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].source, "solar.txt");
}

#[test]
fn lance_store_rejects_wrong_dimension() {
    let tmp = TempDir::new().unwrap();
    let store = LanceStore::open(tmp.path(), "chunks", DIM + 1).expect("open");
    assert!(store.upsert(&corpus()).is_err());
}

#[test]
fn memory_store_fetch_skips_unknown_and_zero() {
    let store = MemoryStore::new();
    store.upsert(&corpus()).unwrap();
    let records = store.fetch_by_seq(&[0, 4]).unwrap();
    assert!(records.is_empty());
    assert!(!store.is_empty().unwrap());
}
