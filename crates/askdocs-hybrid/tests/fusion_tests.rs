use askdocs_core::types::{point_id, Payload, RetrievalCandidate};
use askdocs_hybrid::{reciprocal_rank_fusion, RRF_K};

fn cand(name: &str) -> RetrievalCandidate {
    RetrievalCandidate {
        id: point_id(name, 0),
        seq: None,
        payload: Payload {
            display_text: name.into(),
            search_text: name.into(),
            source: name.into(),
            chunk_index: 0,
            context_preview: String::new(),
            content_hash: String::new(),
            extra: Default::default(),
        },
        score: 0.0,
    }
}

fn names(list: &[RetrievalCandidate]) -> Vec<String> {
    list.iter().map(|c| c.payload.source.clone()).collect()
}

#[test]
fn fused_order_and_scores_match_rrf() {
    let dense = vec![cand("A"), cand("B")];
    let sparse = vec![cand("B"), cand("C")];
    let fused = reciprocal_rank_fusion(&[dense, sparse], 15);
    assert_eq!(names(&fused), vec!["B", "A", "C"]);
    let expect = [1.0 / 62.0 + 1.0 / 61.0, 1.0 / 61.0, 1.0 / 62.0];
    for (c, e) in fused.iter().zip(expect) {
        assert!((f64::from(c.score) - e).abs() < 1e-6, "{} vs {}", c.score, e);
    }
    assert!((fused[1].score - 0.0164).abs() < 1e-4);
    assert!((fused[0].score - 0.0325).abs() < 1e-4);
    assert_eq!(RRF_K, 60.0);
}

#[test]
fn no_duplicates_and_truncated_to_limit() {
    let dense = vec![cand("A"), cand("B"), cand("C")];
    let sparse = vec![cand("C"), cand("B"), cand("A")];
    let fused = reciprocal_rank_fusion(&[dense, sparse], 2);
    assert_eq!(fused.len(), 2);
    assert_ne!(fused[0].id, fused[1].id);
}

#[test]
fn ties_keep_first_appearance_order() {
    // A and C tie at rank 1 in their lists; A was seen first.
    let fused = reciprocal_rank_fusion(&[vec![cand("A")], vec![cand("C")]], 10);
    assert_eq!(names(&fused), vec!["A", "C"]);
}

#[test]
fn empty_list_degrades_to_other_ranks() {
    let fused = reciprocal_rank_fusion(&[vec![], vec![cand("X"), cand("Y")]], 10);
    assert_eq!(names(&fused), vec!["X", "Y"]);
    assert!((f64::from(fused[0].score) - 1.0 / 61.0).abs() < 1e-6);
    assert!(reciprocal_rank_fusion(&[vec![], vec![]], 10).is_empty());
}
