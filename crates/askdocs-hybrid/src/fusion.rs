//! Reciprocal Rank Fusion: score = Σ 1/(k + rank_i), ranks 1-based.
//!
//! Combines independently ranked lists without normalising their scores. An
//! id missing from a list gets nothing from that list.

use std::collections::HashMap;

use askdocs_core::types::RetrievalCandidate;
use uuid::Uuid;

pub const RRF_K: f64 = 60.0;

/// Fuses `lists` (each best-first) and keeps the top `limit`.
///
/// Ties keep the order in which ids were first seen, earlier lists first.
pub fn reciprocal_rank_fusion(lists: &[Vec<RetrievalCandidate>], limit: usize) -> Vec<RetrievalCandidate> {
    let mut fused: Vec<(RetrievalCandidate, f64)> = Vec::new();
    let mut position: HashMap<Uuid, usize> = HashMap::new();

    for list in lists {
        for (i, candidate) in list.iter().enumerate() {
            let rrf = 1.0 / (RRF_K + (i + 1) as f64);
            match position.get(&candidate.id) {
                Some(&at) => fused[at].1 += rrf,
                None => {
                    position.insert(candidate.id, fused.len());
                    fused.push((candidate.clone(), rrf));
                }
            }
        }
    }

    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
        .into_iter()
        .take(limit)
        .map(|(mut candidate, score)| {
            candidate.score = score as f32;
            candidate
        })
        .collect()
}
