use std::ops::Range;
use std::path::Path;

use anyhow::{anyhow, Result};
use askdocs_core::chunking::{TokenCodec, WhitespaceCodec};
use tokenizers::Tokenizer;
use tracing::warn;

/// Counts tokens with the embedding model's own tokenizer.
pub struct HfTokenCodec {
    tokenizer: Tokenizer,
}

impl HfTokenCodec {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
        Self::from_tokenizer(tokenizer)
    }

    pub fn from_tokenizer(mut tokenizer: Tokenizer) -> Result<Self> {
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("Failed to disable truncation: {}", e))?;
        tokenizer.with_padding(None);
        Ok(Self { tokenizer })
    }
}

impl TokenCodec for HfTokenCodec {
    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc
                .get_offsets()
                .iter()
                .filter(|(start, end)| end > start)
                .map(|&(start, end)| start..end)
                .collect(),
            Err(e) => {
                warn!(error = %e, "tokenizer failed, counting words instead");
                WhitespaceCodec.token_spans(text)
            }
        }
    }
}
