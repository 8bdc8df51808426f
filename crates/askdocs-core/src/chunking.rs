//! Token-aware semantic chunker.
//!
//! Text is cut at paragraph boundaries, long paragraphs at sentence
//! boundaries, and whatever is still too long at token level. Units are packed
//! greedily into chunks of at most `chunk_size` tokens, and each new chunk
//! starts with the trailing `chunk_overlap` tokens of the previous one. The
//! seed only shrinks when the full tail would not fit beside the next unit.
//! Sentences of one paragraph are rejoined with their original whitespace.
//!
//! Token counting is delegated to a [`TokenCodec`]. Codecs report byte spans,
//! so tails and hard splits are always slices of the original text.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, Meta};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

pub trait TokenCodec: Send + Sync {
    /// Byte ranges of each token within `text`, in order.
    fn token_spans(&self, text: &str) -> Vec<Range<usize>>;

    fn count(&self, text: &str) -> usize {
        self.token_spans(text).len()
    }
}

/// Whitespace-delimited words as tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCodec;

impl TokenCodec for WhitespaceCodec {
    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut start: Option<usize> = None;
        for (i, ch) in text.char_indices() {
            if ch.is_whitespace() {
                if let Some(s) = start.take() {
                    spans.push(s..i);
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            spans.push(s..text.len());
        }
        spans
    }

    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

// A paragraph or sentence, with the whitespace that preceded it in the source.
struct Unit<'a> {
    text: &'a str,
    sep: &'a str,
}

#[derive(Default)]
struct Buffer {
    text: String,
    // True once a real unit (not just an overlap seed) has been added.
    fresh: bool,
}

impl Buffer {
    fn seeded(seed: String) -> Self {
        Self { text: seed, fresh: false }
    }

    fn joined_with(&self, unit: &Unit<'_>) -> String {
        if self.text.is_empty() {
            unit.text.to_string()
        } else {
            format!("{}{}{}", self.text, unit.sep, unit.text)
        }
    }

    fn push(&mut self, unit: &Unit<'_>) {
        self.text = self.joined_with(unit);
        self.fresh = true;
    }
}

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    codec: Arc<dyn TokenCodec>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, codec: Arc<dyn TokenCodec>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap, codec })
    }

    pub fn from_config(cfg: &ChunkingConfig, codec: Arc<dyn TokenCodec>) -> Result<Self> {
        Self::new(cfg.chunk_size, cfg.chunk_overlap, codec)
    }

    /// Splits `text` into chunks of at most `chunk_size` tokens each.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut buffer = Buffer::default();

        for unit in self.semantic_units(text) {
            let unit_len = self.codec.count(unit.text);
            if unit_len == 0 {
                continue;
            }

            if unit_len > self.chunk_size {
                flush(&mut buffer, &mut chunks);
                // The first window starts on the previous chunk's tail.
                let long = match chunks.last() {
                    Some(prev) => Buffer::seeded(self.tail(prev, self.chunk_overlap)).joined_with(&unit),
                    None => unit.text.to_string(),
                };
                chunks.extend(self.split_long_unit(&long));
                buffer = match chunks.last() {
                    Some(prev) => Buffer::seeded(self.tail(prev, self.chunk_overlap)),
                    None => Buffer::default(),
                };
                continue;
            }

            if self.codec.count(&buffer.joined_with(&unit)) <= self.chunk_size {
                buffer.push(&unit);
                continue;
            }

            flush(&mut buffer, &mut chunks);
            buffer = self.seed_for(chunks.last(), &unit, unit_len);
            buffer.push(&unit);
        }
        flush(&mut buffer, &mut chunks);

        debug!(chunks = chunks.len(), "split text");
        chunks
    }

    /// Splits a whole document and stamps source metadata on each chunk.
    pub fn chunk_document(&self, source: &str, text: &str, extra: &Meta) -> Vec<Chunk> {
        let pieces = self.split(text);
        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                text,
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    chunk_index,
                    total_chunks: total,
                    extra: extra.clone(),
                },
            })
            .collect()
    }

    fn semantic_units<'a>(&self, text: &'a str) -> Vec<Unit<'a>> {
        let mut units = Vec::new();
        for paragraph in paragraphs(text) {
            if self.codec.count(paragraph) <= self.chunk_size {
                units.push(Unit { text: paragraph, sep: PARAGRAPH_SEPARATOR });
                continue;
            }
            let mut prev_end = None;
            for range in sentences(paragraph) {
                let sep = match prev_end {
                    Some(end) => &paragraph[end..range.start],
                    None => PARAGRAPH_SEPARATOR,
                };
                prev_end = Some(range.end);
                units.push(Unit { text: &paragraph[range], sep });
            }
        }
        units
    }

    // Largest tail of `prev` (at most `chunk_overlap` tokens) that still lets
    // `unit` fit in one chunk.
    fn seed_for(&self, prev: Option<&String>, unit: &Unit<'_>, unit_len: usize) -> Buffer {
        let Some(prev) = prev else {
            return Buffer::default();
        };
        let mut n = self.chunk_overlap.min(self.chunk_size.saturating_sub(unit_len));
        while n > 0 {
            let seed = self.tail(prev, n);
            if seed.is_empty() {
                break;
            }
            let buffer = Buffer::seeded(seed);
            if self.codec.count(&buffer.joined_with(unit)) <= self.chunk_size {
                return buffer;
            }
            n -= 1;
        }
        Buffer::default()
    }

    fn tail(&self, text: &str, n: usize) -> String {
        if n == 0 {
            return String::new();
        }
        let spans = self.codec.token_spans(text);
        if spans.len() <= n {
            return text.trim().to_string();
        }
        slice_spans(text, &spans, spans.len() - n, spans.len()).trim().to_string()
    }

    fn split_long_unit(&self, unit: &str) -> Vec<String> {
        let spans = self.codec.token_spans(unit);
        let stride = self.chunk_size - self.chunk_overlap;
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < spans.len() {
            let end = (start + self.chunk_size).min(spans.len());
            let piece = slice_spans(unit, &spans, start, end).trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }
            if end == spans.len() {
                break;
            }
            start += stride;
        }
        pieces
    }
}

fn flush(buffer: &mut Buffer, chunks: &mut Vec<String>) {
    if buffer.fresh {
        let text = buffer.text.trim();
        if !text.is_empty() {
            chunks.push(text.to_string());
        }
    }
    *buffer = Buffer::default();
}

fn slice_spans<'a>(text: &'a str, spans: &[Range<usize>], from: usize, to: usize) -> &'a str {
    let start = spans[from].start;
    let end = spans[to - 1].end.max(start);
    text.get(start..end).unwrap_or("")
}

/// Blank-line separated paragraphs, trimmed, empties dropped.
fn paragraphs(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                out.push(text[s..end].trim());
            }
        } else {
            if start.is_none() {
                start = Some(line_start);
            }
            end = offset;
        }
    }
    if let Some(s) = start {
        out.push(text[s..end].trim());
    }
    out.retain(|p| !p.is_empty());
    out
}

/// Byte ranges of the sentences in `paragraph`. Cuts after `.`, `!` or `?`
/// when followed by whitespace and an uppercase letter or digit.
fn sentences(paragraph: &str) -> Vec<Range<usize>> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        let (pos, ch) = chars[i];
        if matches!(ch, '.' | '!' | '?') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            let next_starts_sentence = j < chars.len()
                && (chars[j].1.is_uppercase() || chars[j].1.is_ascii_digit());
            if j > i + 1 && next_starts_sentence {
                push_trimmed(paragraph, start..pos + ch.len_utf8(), &mut out);
                start = chars[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    push_trimmed(paragraph, start..paragraph.len(), &mut out);
    out
}

fn push_trimmed(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let lead = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if !trimmed.is_empty() {
        let start = range.start + lead;
        out.push(start..start + trimmed.len());
    }
}
