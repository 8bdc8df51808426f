use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use askdocs_core::config::EnrichmentConfig;
use askdocs_core::traits::{CompletionRequest, LanguageModel};
use askdocs_core::types::{Chunk, ChunkMetadata, Meta};
use askdocs_llm::{clean_context, compose_search_text, neighbor_contexts, ContextEnricher};

/// Replies with a context naming the chunk, failing for chunks containing "FAIL".
struct Situating {
    calls: AtomicUsize,
}

impl LanguageModel for Situating {
    fn name(&self) -> &str {
        "situating"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let chunk = request
            .user
            .split("<chunk>\n")
            .nth(1)
            .and_then(|rest| rest.split("\n</chunk>").next())
            .unwrap_or_default();
        if chunk.contains("FAIL") {
            return Err(anyhow!("model crashed"));
        }
        if chunk.contains("BLANK") {
            return Ok("<think>nothing to say</think>".into());
        }
        Ok(format!("<think>consider</think>Context: about {chunk}"))
    }
}

fn chunk(source: &str, idx: usize, text: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        metadata: ChunkMetadata { source: source.into(), chunk_index: idx, total_chunks: 0, extra: Meta::new() },
    }
}

fn cfg(batch_size: usize, pause_ms: u64) -> EnrichmentConfig {
    EnrichmentConfig { enabled: true, batch_size, pause_ms, neighbor_window: 3 }
}

#[test]
fn context_labels_and_reasoning_are_removed() {
    assert_eq!(clean_context("<think>x</think>\nContext: the pump section"), "the pump section");
    assert_eq!(clean_context("context: Context: doubled"), "doubled");
    assert_eq!(clean_context("  plain  "), "plain");
    assert_eq!(compose_search_text("ctx", "body"), "Context: ctx\n\nContent: body");
}

#[test]
fn neighbours_stay_within_document_and_window() {
    let mut chunks: Vec<Chunk> = (0..6).map(|i| chunk("a.md", i, &format!("a{i}"))).collect();
    chunks.insert(2, chunk("b.md", 0, "b0"));
    let ctx = neighbor_contexts(&chunks, 1);
    assert_eq!(ctx[0], "a0\n---\na1");
    assert_eq!(ctx[2], "b0");
    assert_eq!(ctx[3], "a1\n---\na2\n---\na3");
    assert_eq!(ctx[6], "a4\n---\na5");
}

#[tokio::test]
async fn enriches_in_order_with_fallbacks() {
    let model = Arc::new(Situating { calls: AtomicUsize::new(0) });
    let enricher = ContextEnricher::new(model.clone(), &cfg(2, 0));
    let chunks = vec![
        chunk("a.md", 0, "pumps"),
        chunk("a.md", 1, "FAIL here"),
        chunk("a.md", 2, "BLANK reply"),
        chunk("a.md", 3, "filters"),
        chunk("b.md", 0, "seeds"),
    ];
    let prepared = enricher.enrich(chunks).await;

    assert_eq!(model.calls.load(Ordering::SeqCst), 5);
    let texts: Vec<&str> = prepared.iter().map(|p| p.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["pumps", "FAIL here", "BLANK reply", "filters", "seeds"]);
    assert_eq!(prepared[0].search_text, "Context: about pumps\n\nContent: pumps");
    assert_eq!(prepared[1].search_text, "FAIL here");
    assert_eq!(prepared[2].search_text, "BLANK reply");
    assert_eq!(prepared[4].search_text, "Context: about seeds\n\nContent: seeds");
}

#[tokio::test]
async fn pauses_between_batches() {
    let model = Arc::new(Situating { calls: AtomicUsize::new(0) });
    let enricher = ContextEnricher::new(model, &cfg(2, 40));
    let chunks: Vec<Chunk> = (0..5).map(|i| chunk("a.md", i, &format!("part {i}"))).collect();
    let started = Instant::now();
    let prepared = enricher.enrich(chunks).await;
    assert_eq!(prepared.len(), 5);
    // three batches, two pauses
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn empty_input_makes_no_calls() {
    let model = Arc::new(Situating { calls: AtomicUsize::new(0) });
    let enricher = ContextEnricher::new(model.clone(), &cfg(10, 1000));
    assert!(enricher.enrich(Vec::new()).await.is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}
