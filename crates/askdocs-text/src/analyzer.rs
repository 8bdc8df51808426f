use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

pub const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

pub fn build_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build()
}

/// Shared analyzer; each call works on its own clone since tantivy streams borrow mutably.
#[derive(Clone)]
pub struct LexicalAnalyzer {
	analyzer: TextAnalyzer,
}

impl Default for LexicalAnalyzer {
	fn default() -> Self {
		Self { analyzer: build_analyzer() }
	}
}

impl LexicalAnalyzer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Lowercased content terms of `text` in order, stop words removed.
	pub fn terms(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		let mut terms = Vec::new();
		while stream.advance() {
			terms.push(stream.token().text.clone());
		}
		terms
	}
}
