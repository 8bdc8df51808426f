//! Collaborator seams. Every external service sits behind one of these.

use crate::filter::{Predicate, SearchFilter};
use crate::types::{IndexedPoint, RetrievalCandidate, SeqRecord, SparseVector};

/// Dense encoder producing L2-normalised vectors of `dim()` floats.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

pub trait SparseEncoder: Send + Sync {
    fn embed_sparse(&self, texts: &[String]) -> anyhow::Result<Vec<SparseVector>>;
}

/// Scores `(query, passage)` pairs; one score per pair, higher is more relevant.
pub trait RelevanceJudge: Send + Sync {
    fn score_pairs(&self, pairs: &[(String, String)]) -> anyhow::Result<Vec<f32>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// JSON schema the reply must follow, for structured calls.
    pub schema: Option<serde_json::Value>,
}

pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

pub trait VectorStore: Send + Sync {
    /// Inserts or replaces points by id; returns how many were written.
    fn upsert(&self, points: &[IndexedPoint]) -> anyhow::Result<usize>;
    fn search_dense(
        &self,
        query: &[f32],
        filter: Option<&Predicate>,
        k: usize,
    ) -> anyhow::Result<Vec<RetrievalCandidate>>;
    fn search_sparse(
        &self,
        query: &SparseVector,
        filter: Option<&Predicate>,
        k: usize,
    ) -> anyhow::Result<Vec<RetrievalCandidate>>;
    fn len(&self) -> anyhow::Result<usize>;
    fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len()? == 0)
    }
}

pub trait SequentialStore: Send + Sync {
    /// Rows for the given sequential ids, ascending by seq. Unknown ids are skipped.
    fn fetch_by_seq(&self, seqs: &[u64]) -> anyhow::Result<Vec<SeqRecord>>;
}

pub trait DocumentStore: VectorStore + SequentialStore {}

impl<T: VectorStore + SequentialStore> DocumentStore for T {}

/// What the query flow retrieves through.
pub trait SearchEngine: Send + Sync {
    fn query(
        &self,
        query: &str,
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> anyhow::Result<Vec<RetrievalCandidate>>;
}
