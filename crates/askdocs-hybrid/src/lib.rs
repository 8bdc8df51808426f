//! askdocs-hybrid
//!
//! Hybrid retrieval: dense and sparse top-K lists fused with RRF, reranked by
//! a relevance judge, optionally widened by window merging. Also hosts the
//! ingestion indexer that writes both vector kinds.

pub mod fusion;
pub mod ingest;
pub mod rerank;
pub mod window;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use askdocs_core::config::RetrievalConfig;
use askdocs_core::filter::SearchFilter;
use askdocs_core::traits::{DocumentStore, Embedder, SearchEngine, SparseEncoder};
use askdocs_core::types::{Payload, RetrievalCandidate, CONTEXT_PREVIEW_CHARS};
use tracing::{debug, info};

pub use fusion::{reciprocal_rank_fusion, RRF_K};
pub use ingest::Indexer;
pub use rerank::{KeywordOverlapJudge, Reranker};
pub use window::{into_parts, merge_fragments, MergedPassage, WindowMerger};

pub struct HybridSearchEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    sparse: Arc<dyn SparseEncoder>,
    reranker: Reranker,
    candidate_multiplier: usize,
    window: Option<(WindowMerger, u64)>,
}

impl HybridSearchEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        sparse: Arc<dyn SparseEncoder>,
        reranker: Reranker,
        cfg: &RetrievalConfig,
    ) -> Self {
        let window = cfg
            .window
            .enabled
            .then(|| (WindowMerger::new(store.clone(), &cfg.window), cfg.window.size));
        Self { store, embedder, sparse, reranker, candidate_multiplier: cfg.candidate_multiplier.max(1), window }
    }

    /// Enables window merging of `size` following records, overriding config.
    #[must_use]
    pub fn with_window(mut self, merger: WindowMerger, size: u64) -> Self {
        self.window = Some((merger, size));
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Fused dense + sparse candidates, at most `candidate_multiplier × limit`.
    pub fn candidates(&self, query: &str, filter: Option<&SearchFilter>, limit: usize) -> Result<Vec<RetrievalCandidate>> {
        let k = self.candidate_multiplier * limit;
        if k == 0 {
            return Ok(Vec::new());
        }
        let predicate = filter.map(SearchFilter::compile).transpose()?;
        let text = [query.to_string()];
        let dense_query = self
            .embedder
            .embed_batch(&text)?
            .pop()
            .ok_or_else(|| anyhow!("dense encoder returned no vector"))?;
        let sparse_query = self
            .sparse
            .embed_sparse(&text)?
            .pop()
            .ok_or_else(|| anyhow!("sparse encoder returned no vector"))?;

        let dense = self.store.search_dense(&dense_query, predicate.as_ref(), k)?;
        let mut sparse = if sparse_query.is_empty() {
            Vec::new()
        } else {
            self.store.search_sparse(&sparse_query, predicate.as_ref(), k)?
        };
        // No shared term means no lexical evidence.
        sparse.retain(|c| c.score > 0.0);

        let fused = reciprocal_rank_fusion(&[dense, sparse], k);
        debug!(k, fused = fused.len(), "fused candidates");
        Ok(fused)
    }

    /// Candidates reranked by the judge and cut to `limit`.
    pub fn search(&self, query: &str, filter: Option<&SearchFilter>, limit: usize) -> Result<Vec<RetrievalCandidate>> {
        let candidates = self.candidates(query, filter, limit)?;
        let mut ranked = self.reranker.rerank(query, candidates)?;
        ranked.truncate(limit);
        info!(query, results = ranked.len(), "search");
        Ok(ranked)
    }

    /// `search` followed by window merging and a second rerank.
    pub fn search_passages(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        limit: usize,
        window_size: u64,
    ) -> Result<Vec<MergedPassage>> {
        let hits = self.search(query, filter, limit)?;
        Ok(match &self.window {
            Some((merger, _)) => merger.expand_and_rerank(query, &hits, window_size, &self.reranker),
            None => hits
                .into_iter()
                .map(|c| MergedPassage {
                    id: c.id,
                    seq: c.seq,
                    text: c.payload.passage_text(),
                    source: c.payload.source,
                    score: c.score,
                })
                .collect(),
        })
    }
}

impl SearchEngine for HybridSearchEngine {
    fn query(&self, query: &str, filter: Option<&SearchFilter>, limit: usize) -> Result<Vec<RetrievalCandidate>> {
        let Some((merger, size)) = &self.window else {
            return self.search(query, filter, limit);
        };
        let hits = self.search(query, filter, limit)?;
        let mut base: HashMap<_, RetrievalCandidate> = hits.iter().map(|c| (c.id, c.clone())).collect();
        let passages = merger.expand_and_rerank(query, &hits, *size, &self.reranker);
        Ok(passages
            .into_iter()
            .filter_map(|p| {
                let mut candidate = base.remove(&p.id)?;
                candidate.payload = merged_payload(&candidate.payload, &p);
                candidate.score = p.score;
                Some(candidate)
            })
            .collect())
    }
}

fn merged_payload(base: &Payload, passage: &MergedPassage) -> Payload {
    Payload {
        display_text: passage.text.clone(),
        search_text: passage.text.clone(),
        source: passage.source.clone(),
        context_preview: passage.text.chars().take(CONTEXT_PREVIEW_CHARS).collect(),
        ..base.clone()
    }
}
