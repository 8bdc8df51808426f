use std::collections::HashMap;
use std::hash::Hasher;

use askdocs_core::config::EmbeddingConfig;
use askdocs_core::traits::SparseEncoder;
use askdocs_core::types::SparseVector;
use tracing::debug;
use twox_hash::XxHash64;

use crate::analyzer::LexicalAnalyzer;

/// Sparse lexical encoder: analyzed terms hashed into a fixed vocabulary,
/// weighted `1 + ln(tf)`.
#[derive(Clone)]
pub struct LexicalSparseEncoder {
	analyzer: LexicalAnalyzer,
	vocab_size: u32,
}

impl LexicalSparseEncoder {
	pub fn new(vocab_size: u32) -> Self {
		Self { analyzer: LexicalAnalyzer::new(), vocab_size: vocab_size.max(1) }
	}

	pub fn from_config(cfg: &EmbeddingConfig) -> Self {
		Self::new(cfg.sparse_vocab_size)
	}

	pub fn vocab_size(&self) -> u32 {
		self.vocab_size
	}

	pub fn term_index(&self, term: &str) -> u32 {
		let mut hasher = XxHash64::with_seed(0);
		hasher.write(term.as_bytes());
		(hasher.finish() % u64::from(self.vocab_size)) as u32
	}

	pub fn encode(&self, text: &str) -> SparseVector {
		let mut tf: HashMap<u32, u32> = HashMap::new();
		for term in self.analyzer.terms(text) {
			*tf.entry(self.term_index(&term)).or_insert(0) += 1;
		}
		SparseVector::from_weights(tf.into_iter().map(|(idx, n)| (idx, 1.0 + (n as f32).ln())))
	}
}

impl SparseEncoder for LexicalSparseEncoder {
	fn embed_sparse(&self, texts: &[String]) -> anyhow::Result<Vec<SparseVector>> {
		let out: Vec<SparseVector> = texts.iter().map(|t| self.encode(t)).collect();
		debug!(texts = texts.len(), "encoded sparse vectors");
		Ok(out)
	}
}
