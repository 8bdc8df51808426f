//! Context window merging.
//!
//! A hit is widened with the records that follow it in storage order
//! (`seq .. seq + window`), and the fragments are stitched back together
//! with their chunk overlap removed. This recovers sentences that the
//! chunker cut at a chunk boundary.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use askdocs_core::config::WindowConfig;
use askdocs_core::traits::DocumentStore;
use askdocs_core::types::{RetrievalCandidate, SeqRecord};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::rerank::Reranker;

/// Extra bytes scanned beyond the declared overlap.
const OVERLAP_SLACK: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct MergedPassage {
    pub id: Uuid,
    pub seq: Option<u64>,
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Splits passages into parallel `(texts, sources)` lists.
pub fn into_parts(passages: Vec<MergedPassage>) -> (Vec<String>, Vec<String>) {
    passages.into_iter().map(|p| (p.text, p.source)).unzip()
}

/// Concatenates fragments, dropping the longest suffix/prefix overlap between
/// neighbours. Overlaps shorter than `min(min_overlap, overlap_hint)` bytes are
/// ignored and the fragments are joined with a newline instead.
pub fn merge_fragments<S: AsRef<str>>(fragments: &[S], overlap_hint: usize, min_overlap: usize) -> String {
    let floor = min_overlap.min(overlap_hint).max(1);
    let mut merged = String::new();
    for fragment in fragments {
        let next = fragment.as_ref();
        if next.is_empty() {
            continue;
        }
        if merged.is_empty() {
            merged.push_str(next);
            continue;
        }
        match longest_overlap(&merged, next, overlap_hint + OVERLAP_SLACK, floor) {
            Some(len) => merged.push_str(&next[len..]),
            None => {
                merged.push('\n');
                merged.push_str(next);
            }
        }
    }
    merged
}

fn longest_overlap(merged: &str, next: &str, max_len: usize, floor: usize) -> Option<usize> {
    let scan = next.len().min(max_len).min(merged.len());
    (floor..=scan).rev().find(|&len| {
        next.is_char_boundary(len)
            && merged.is_char_boundary(merged.len() - len)
            && merged.ends_with(&next[..len])
    })
}

pub struct WindowMerger {
    store: Arc<dyn DocumentStore>,
    overlap_hint: usize,
    min_overlap: usize,
}

impl WindowMerger {
    pub fn new(store: Arc<dyn DocumentStore>, cfg: &WindowConfig) -> Self {
        Self { store, overlap_hint: cfg.overlap_hint, min_overlap: cfg.min_overlap }
    }

    /// Merges each candidate with the `window_size` records after it.
    ///
    /// All records are fetched in one call. Candidates without a `seq`, or
    /// whose records are missing, keep their own passage text and source.
    pub fn expand(&self, candidates: &[RetrievalCandidate], window_size: u64) -> Vec<MergedPassage> {
        let wanted: BTreeSet<u64> = candidates
            .iter()
            .filter_map(|c| c.seq)
            .flat_map(|seq| seq..=seq.saturating_add(window_size))
            .collect();

        let records: HashMap<u64, SeqRecord> = if wanted.is_empty() {
            HashMap::new()
        } else {
            let seqs: Vec<u64> = wanted.into_iter().collect();
            match self.store.fetch_by_seq(&seqs) {
                Ok(rows) => rows.into_iter().map(|r| (r.seq, r)).collect(),
                Err(e) => {
                    warn!(error = %e, "window fetch failed, using unmerged passages");
                    HashMap::new()
                }
            }
        };

        let passages: Vec<MergedPassage> = candidates.iter().map(|c| self.merge_one(c, window_size, &records)).collect();
        debug!(passages = passages.len(), records = records.len(), "expanded windows");
        passages
    }

    fn merge_one(&self, candidate: &RetrievalCandidate, window_size: u64, records: &HashMap<u64, SeqRecord>) -> MergedPassage {
        let fallback = || MergedPassage {
            id: candidate.id,
            seq: candidate.seq,
            text: candidate.payload.passage_text(),
            source: candidate.payload.source.clone(),
            score: candidate.score,
        };
        let Some(seq) = candidate.seq else {
            return fallback();
        };
        let window: Vec<&SeqRecord> = (seq..=seq.saturating_add(window_size)).filter_map(|s| records.get(&s)).collect();
        if window.is_empty() {
            return fallback();
        }
        let contents: Vec<&str> = window.iter().map(|r| r.content.as_str()).collect();
        let source = window
            .iter()
            .rev()
            .map(|r| r.source.as_str())
            .find(|s| !s.is_empty())
            .unwrap_or(candidate.payload.source.as_str())
            .to_string();
        MergedPassage {
            id: candidate.id,
            seq: candidate.seq,
            text: merge_fragments(&contents, self.overlap_hint, self.min_overlap),
            source,
            score: candidate.score,
        }
    }

    /// `expand`, then rescore the merged texts. A judge failure keeps merge order.
    pub fn expand_and_rerank(
        &self,
        query: &str,
        candidates: &[RetrievalCandidate],
        window_size: u64,
        reranker: &Reranker,
    ) -> Vec<MergedPassage> {
        let mut passages = self.expand(candidates, window_size);
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        match reranker.score_texts(query, &texts) {
            Ok(scores) => {
                for (p, s) in passages.iter_mut().zip(scores) {
                    p.score = s;
                }
                passages.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            }
            Err(e) => warn!(error = %e, "rerank of merged passages failed, keeping merge order"),
        }
        passages
    }
}
