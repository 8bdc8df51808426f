use std::str::FromStr;
use std::sync::Arc;

use askdocs_core::chunking::{Chunker, TokenCodec};
use askdocs_embed::HfTokenCodec;
use tokenizers::Tokenizer;

const WORD_LEVEL: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": { "type": "WordLevel", "vocab": { "[UNK]": 0, "pump": 1, "seal": 2 }, "unk_token": "[UNK]" }
}"#;

fn codec() -> HfTokenCodec {
    let tokenizer = Tokenizer::from_str(WORD_LEVEL).expect("tokenizer json");
    HfTokenCodec::from_tokenizer(tokenizer).expect("codec")
}

#[test]
fn spans_are_byte_ranges_into_the_text() {
    let text = "pump, seal";
    let spans = codec().token_spans(text);
    let tokens: Vec<&str> = spans.iter().map(|r| &text[r.clone()]).collect();
    assert_eq!(tokens, vec!["pump", ",", "seal"]);
}

#[test]
fn chunker_counts_with_tokenizer() {
    let chunker = Chunker::new(3, 1, Arc::new(codec())).expect("chunker");
    // Punctuation counts as a token here, unlike with whitespace words.
    let chunks = chunker.split("pump, seal, pump");
    assert!(chunks.len() >= 2);
    for ch in &chunks {
        assert!(codec().count(ch) <= 3);
    }
}
