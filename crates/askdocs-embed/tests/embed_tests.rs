use askdocs_core::config::EmbeddingConfig;
use askdocs_core::traits::Embedder;
use askdocs_embed::{get_default_embedder, resolve_model_dir, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let cfg = EmbeddingConfig { use_fake: true, ..EmbeddingConfig::default() };
    let embedder = get_default_embedder(&cfg).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");

    assert_eq!(embedder.dim(), 1024);
    assert_eq!(embs[0].len(), 1024);
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_words_are_closer_than_disjoint_ones() {
    let e = HashEmbedder::new(256);
    let q = e.embed_text("How do I prime the well pump?");
    let near = e.embed_text("Priming the well pump takes a bucket of water.");
    let far = e.embed_text("Solar panels charge batteries at noon.");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn missing_model_dir_is_reported() {
    let cfg = EmbeddingConfig {
        model_dir: Some("/definitely/not/here".into()),
        ..EmbeddingConfig::default()
    };
    if std::env::var("APP_MODEL_DIR").is_err()
        && std::env::var("MODEL_DIR").is_err()
        && !std::path::Path::new("models/bge-m3").exists()
    {
        assert!(resolve_model_dir(&cfg).is_err());
    }
}
