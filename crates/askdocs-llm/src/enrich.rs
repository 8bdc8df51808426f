//! Contextual enrichment at ingestion.
//!
//! Each chunk is shown to the fast model together with its neighbours from the
//! same document; the short situating context it writes is prepended to the
//! text that gets embedded. Display text stays untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use askdocs_core::config::EnrichmentConfig;
use askdocs_core::traits::{CompletionRequest, LanguageModel};
use askdocs_core::types::{Chunk, PreparedChunk};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::structured::strip_reasoning;

pub const NEIGHBOR_SEPARATOR: &str = "\n---\n";

const SYSTEM_PROMPT: &str = "You situate excerpts within their document to improve search retrieval. \
Reply with one or two sentences of context and nothing else.";

pub struct ContextEnricher {
    model: Arc<dyn LanguageModel>,
    batch_size: usize,
    pause: Duration,
    neighbor_window: usize,
}

impl ContextEnricher {
    pub fn new(model: Arc<dyn LanguageModel>, cfg: &EnrichmentConfig) -> Self {
        Self {
            model,
            batch_size: cfg.batch_size.max(1),
            pause: Duration::from_millis(cfg.pause_ms),
            neighbor_window: cfg.neighbor_window,
        }
    }

    /// Enriches every chunk, preserving input order. Calls run on the blocking
    /// pool in batches; a failed or empty reply keeps the raw chunk text.
    pub async fn enrich(&self, chunks: Vec<Chunk>) -> Vec<PreparedChunk> {
        let contexts = neighbor_contexts(&chunks, self.neighbor_window);
        let total = chunks.len();
        let mut prepared = Vec::with_capacity(total);
        let mut fallbacks = 0usize;
        info!(chunks = total, batch_size = self.batch_size, "enriching chunks");

        let mut jobs = chunks.into_iter().zip(contexts).peekable();
        let mut batch_no = 0usize;
        while jobs.peek().is_some() {
            if batch_no > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            let batch: Vec<(Chunk, String)> = jobs.by_ref().take(self.batch_size).collect();
            let calls = batch.iter().map(|(chunk, neighbors)| {
                let model = Arc::clone(&self.model);
                let request = CompletionRequest {
                    system: SYSTEM_PROMPT.to_string(),
                    user: user_prompt(neighbors, &chunk.text),
                    schema: None,
                };
                tokio::task::spawn_blocking(move || model.complete(&request))
            });
            let replies = join_all(calls).await;
            for ((chunk, _), reply) in batch.into_iter().zip(replies) {
                let context = match reply {
                    Ok(Ok(raw)) => clean_context(&raw),
                    Ok(Err(e)) => {
                        warn!(error = %e, source = %chunk.metadata.source, index = chunk.metadata.chunk_index, "enrichment failed, using raw text");
                        String::new()
                    }
                    Err(e) => {
                        warn!(error = %e, source = %chunk.metadata.source, "enrichment task aborted, using raw text");
                        String::new()
                    }
                };
                if context.is_empty() {
                    fallbacks += 1;
                    prepared.push(PreparedChunk::plain(chunk));
                } else {
                    let search_text = compose_search_text(&context, &chunk.text);
                    prepared.push(PreparedChunk { chunk, search_text });
                }
            }
            batch_no += 1;
            debug!(batch = batch_no, done = prepared.len(), total, "enrichment batch finished");
        }
        info!(chunks = total, fallbacks, "enrichment complete");
        prepared
    }
}

fn user_prompt(neighbors: &str, chunk: &str) -> String {
    format!(
        "<document>\n{neighbors}\n</document>\n\nHere is the chunk to situate within the document:\n\
<chunk>\n{chunk}\n</chunk>\n\nGive a short context that situates this chunk within the overall document."
    )
}

/// For each chunk, up to `window` chunks either side from the same source,
/// itself included, joined with [`NEIGHBOR_SEPARATOR`].
pub fn neighbor_contexts(chunks: &[Chunk], window: usize) -> Vec<String> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut slot = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let group = groups.entry(chunk.metadata.source.as_str()).or_default();
        slot.push(group.len());
        group.push(i);
    }
    chunks
        .iter()
        .zip(slot)
        .map(|(chunk, pos)| {
            let Some(group) = groups.get(chunk.metadata.source.as_str()) else {
                return chunk.text.clone();
            };
            let lo = pos.saturating_sub(window);
            let hi = (pos + window + 1).min(group.len());
            group[lo..hi]
                .iter()
                .map(|&i| chunks[i].text.as_str())
                .collect::<Vec<_>>()
                .join(NEIGHBOR_SEPARATOR)
        })
        .collect()
}

/// Strips reasoning blocks and any leading `Context:` labels.
pub fn clean_context(raw: &str) -> String {
    let mut text = strip_reasoning(raw);
    loop {
        let trimmed = text.trim_start();
        let Some(head) = trimmed.get(..8) else { break };
        if !head.eq_ignore_ascii_case("context:") {
            break;
        }
        text = trimmed[8..].to_string();
    }
    text.trim().to_string()
}

pub fn compose_search_text(context: &str, chunk: &str) -> String {
    format!("Context: {context}\n\nContent: {chunk}")
}
