use std::sync::Arc;

use askdocs_core::traits::RelevanceJudge;
use askdocs_core::types::{point_id, Payload, RetrievalCandidate};
use askdocs_hybrid::{KeywordOverlapJudge, Reranker};

fn cand(i: usize, text: &str) -> RetrievalCandidate {
    RetrievalCandidate {
        id: point_id("doc.txt", i),
        seq: Some(i as u64 + 1),
        payload: Payload {
            display_text: text.into(),
            search_text: text.into(),
            source: "doc.txt".into(),
            chunk_index: i,
            context_preview: String::new(),
            content_hash: String::new(),
            extra: Default::default(),
        },
        score: 1.0,
    }
}

struct Fixed(Vec<f32>);

impl RelevanceJudge for Fixed {
    fn score_pairs(&self, _pairs: &[(String, String)]) -> anyhow::Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

#[test]
fn rerank_overwrites_scores_and_sorts_stably() {
    let reranker = Reranker::new(Arc::new(Fixed(vec![0.2, 0.9, 0.2])));
    let out = reranker.rerank("q", vec![cand(0, "a"), cand(1, "b"), cand(2, "c")]).unwrap();
    let order: Vec<usize> = out.iter().map(|c| c.payload.chunk_index).collect();
    assert_eq!(order, vec![1, 0, 2]);
    assert_eq!(out[0].score, 0.9);
}

#[test]
fn score_count_mismatch_is_an_error() {
    let reranker = Reranker::new(Arc::new(Fixed(vec![0.5])));
    assert!(reranker.rerank("q", vec![cand(0, "a"), cand(1, "b")]).is_err());
}

#[test]
fn empty_candidates_skip_the_judge() {
    let reranker = Reranker::new(Arc::new(Fixed(vec![1.0])));
    assert!(reranker.rerank("q", Vec::new()).unwrap().is_empty());
}

#[test]
fn keyword_overlap_scores_fraction_of_query_terms() {
    let judge = KeywordOverlapJudge::new();
    assert_eq!(judge.score("prime the pump", "How to prime a hand pump"), 1.0);
    assert_eq!(judge.score("prime the pump", "pump seals"), 0.5);
    assert_eq!(judge.score("the and", "anything"), 0.0);
    let scores = judge
        .score_pairs(&[("solar".into(), "Solar panels".into()), ("solar".into(), "water".into())])
        .unwrap();
    assert_eq!(scores, vec![1.0, 0.0]);
}
