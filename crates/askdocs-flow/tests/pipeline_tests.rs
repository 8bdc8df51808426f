mod support;

use std::sync::Arc;

use askdocs_core::chunking::{Chunker, WhitespaceCodec};
use askdocs_core::config::RetrievalConfig;
use askdocs_core::filter::SearchFilter;
use askdocs_core::types::{Meta, PreparedChunk};
use askdocs_embed::HashEmbedder;
use askdocs_flow::prompts::{CLASSIFY_SYSTEM, GENERATE_SYSTEM, GRADE_SYSTEM, REWRITE_SYSTEM};
use askdocs_flow::{FlowController, FlowStatus};
use askdocs_hybrid::{HybridSearchEngine, Indexer, KeywordOverlapJudge, Reranker};
use askdocs_text::LexicalSparseEncoder;
use askdocs_vector::MemoryStore;
use support::{no, route, yes, ScriptedModel};

const NOTES: &[(&str, &str, &str)] = &[
    ("pump.txt", "water", "Prime the well pump with a bucket of water before starting it."),
    ("solar.txt", "power", "Batteries should never discharge below half capacity."),
    ("stove.txt", "heat", "Season the cast iron stove top with a thin layer of oil."),
];

fn engine() -> HybridSearchEngine {
    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(HashEmbedder::new(128));
    let sparse = Arc::new(LexicalSparseEncoder::new(50_000));
    let chunker = Chunker::new(64, 8, Arc::new(WhitespaceCodec)).unwrap();
    let mut prepared = Vec::new();
    for (source, category, text) in NOTES {
        let mut extra = Meta::new();
        extra.insert("category".into(), (*category).into());
        prepared.extend(chunker.chunk_document(source, text, &extra).into_iter().map(PreparedChunk::plain));
    }
    Indexer::new(store.clone(), embedder.clone(), sparse.clone()).index(&prepared).unwrap();
    let reranker = Reranker::new(Arc::new(KeywordOverlapJudge::new()));
    HybridSearchEngine::new(store, embedder, sparse, reranker, &RetrievalConfig::default())
}

/// Grades a document relevant only when it mentions batteries.
fn battery_grader() -> ScriptedModel {
    ScriptedModel::new("fast", |req| match req.system.as_str() {
        CLASSIFY_SYSTEM => route("vector_store"),
        REWRITE_SYSTEM => Ok("battery discharge capacity".into()),
        GRADE_SYSTEM if req.user.contains("Batteries") => yes(),
        GRADE_SYSTEM => no(),
        _ => yes(),
    })
}

#[test]
fn answers_from_the_indexed_library() {
    let fast = Arc::new(battery_grader());
    let smart = Arc::new(ScriptedModel::new("smart", |req| {
        assert!(req.user.contains("half capacity"));
        Ok("Stay above half capacity.".into())
    }));
    let flow = FlowController::new(Arc::new(engine()), fast, smart.clone(), 3, 3);
    let state = flow.run("how far can I drain my batteries?");

    assert_eq!(state.status, FlowStatus::Answered);
    assert_eq!(state.documents.len(), 1);
    assert_eq!(state.documents[0].payload.source, "solar.txt");
    assert_eq!(state.answer(), "Stay above half capacity.");
    assert_eq!(smart.calls_with(GENERATE_SYSTEM), 1);
}

#[test]
fn filter_excluding_the_answer_exhausts_the_loop() {
    let fast = Arc::new(battery_grader());
    let smart = Arc::new(ScriptedModel::new("smart", |_| Ok("unused".into())));
    let flow = FlowController::new(Arc::new(engine()), fast, smart.clone(), 3, 2);
    let filter = SearchFilter::new().with("category", "heat");
    let state = flow.run_filtered("how far can I drain my batteries?", Some(filter));

    assert_eq!(state.status, FlowStatus::Exhausted);
    assert!(state.documents.is_empty());
    assert_eq!(state.attempts, 2);
    assert_eq!(smart.calls(), 0);
}
