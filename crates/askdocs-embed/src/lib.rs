//! askdocs-embed
//!
//! Dense encoders behind `askdocs_core::traits::Embedder`: the BGE-M3
//! XLM-RoBERTa model run with candle, and a deterministic hash encoder for
//! tests and offline runs. Also hosts the tokenizer-backed token codec the
//! chunker can count with.

pub mod codec;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use askdocs_core::chunking::{TokenCodec, WhitespaceCodec};
use askdocs_core::config::{expand_path, ChunkingConfig, EmbeddingConfig};
use askdocs_core::error::Error;
use askdocs_core::traits::Embedder;
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info};

pub use codec::HfTokenCodec;
pub use device::select_device;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl BgeM3Embedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(cfg)?;
        info!(dir = %model_dir.display(), "loading BGE-M3");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .map_or(cfg.dim, |h| h as usize);
        let config: XLMRobertaConfig = serde_json::from_value(raw)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, candle_core::Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim, max_len = cfg.max_len, "BGE-M3 loaded");

        Ok(Self { model, tokenizer, device, dim, max_len: cfg.max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask, token_type_ids) =
            tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let mut rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let emb = rows.pop().ok_or_else(|| anyhow!("model returned no embedding"))?;
        if emb.len() != self.dim {
            return Err(anyhow!("expected {} dims, model produced {}", self.dim, emb.len()));
        }
        debug!(ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(emb)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

fn fake_requested(cfg: &EmbeddingConfig) -> bool {
    cfg.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

/// The hash encoder when fakes are requested, the real model otherwise.
pub fn get_default_embedder(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if fake_requested(cfg) {
        info!(dim = cfg.dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(cfg.dim)));
    }
    Ok(Arc::new(BgeM3Embedder::new(cfg)?))
}

/// Token codec for the chunker: the configured tokenizer, else whitespace words.
pub fn token_codec(cfg: &ChunkingConfig) -> Result<Arc<dyn TokenCodec>> {
    match &cfg.tokenizer_path {
        Some(path) => Ok(Arc::new(HfTokenCodec::from_file(&expand_path(path))?)),
        None => Ok(Arc::new(WhitespaceCodec)),
    }
}

pub fn resolve_model_dir(cfg: &EmbeddingConfig) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &cfg.model_dir {
        candidates.push(expand_path(dir));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            candidates.push(expand_path(dir));
        }
    }
    candidates.push(Path::new("models/bge-m3").to_path_buf());
    candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| Error::NotFound("BGE-M3 model directory".into()).into())
}
