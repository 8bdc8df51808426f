use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use askdocs_core::error::Error;
use askdocs_core::traits::RelevanceJudge;
use askdocs_core::types::RetrievalCandidate;
use askdocs_text::LexicalAnalyzer;
use tracing::debug;

/// Reorders candidates by a relevance judge's scores.
#[derive(Clone)]
pub struct Reranker {
    judge: Arc<dyn RelevanceJudge>,
}

impl Reranker {
    pub fn new(judge: Arc<dyn RelevanceJudge>) -> Self {
        Self { judge }
    }

    /// One score per text, in order. A judge answering with a different count is an error.
    pub fn score_texts(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let pairs: Vec<(String, String)> = texts.iter().map(|t| (query.to_string(), t.clone())).collect();
        let scores = self.judge.score_pairs(&pairs)?;
        if scores.len() != pairs.len() {
            return Err(Error::collaborator(
                "relevance judge",
                format!("returned {} scores for {} pairs", scores.len(), pairs.len()),
            )
            .into());
        }
        Ok(scores)
    }

    /// Overwrites each candidate's score with the judge's and sorts descending (stable).
    pub fn rerank(&self, query: &str, mut candidates: Vec<RetrievalCandidate>) -> Result<Vec<RetrievalCandidate>> {
        let texts: Vec<String> = candidates.iter().map(|c| c.payload.passage_text()).collect();
        let scores = self.score_texts(query, &texts)?;
        for (candidate, score) in candidates.iter_mut().zip(scores) {
            candidate.score = score;
        }
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        debug!(candidates = candidates.len(), "reranked");
        Ok(candidates)
    }
}

/// Fraction of distinct query terms found in the passage. Needs no model.
#[derive(Clone, Default)]
pub struct KeywordOverlapJudge {
    analyzer: LexicalAnalyzer,
}

impl KeywordOverlapJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, query: &str, passage: &str) -> f32 {
        let query_terms: HashSet<String> = self.analyzer.terms(query).into_iter().collect();
        if query_terms.is_empty() {
            return 0.0;
        }
        let passage_terms: HashSet<String> = self.analyzer.terms(passage).into_iter().collect();
        let hits = query_terms.iter().filter(|t| passage_terms.contains(*t)).count();
        hits as f32 / query_terms.len() as f32
    }
}

impl RelevanceJudge for KeywordOverlapJudge {
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        Ok(pairs.iter().map(|(q, p)| self.score(q, p)).collect())
    }
}
