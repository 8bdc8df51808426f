//! askdocs-text
//!
//! Lexical side of retrieval: a tantivy analyzer chain (simple tokenizer,
//! lowercasing, stop words) and the hashing sparse encoder built on top of it.

pub mod analyzer;
pub mod sparse;

pub use analyzer::LexicalAnalyzer;
pub use sparse::LexicalSparseEncoder;
