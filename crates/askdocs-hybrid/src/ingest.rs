use std::sync::Arc;

use anyhow::{anyhow, Result};
use askdocs_core::traits::{DocumentStore, Embedder, SparseEncoder};
use askdocs_core::types::{IndexedPoint, Payload, PreparedChunk};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

const DEFAULT_BATCH: usize = 64;

/// Embeds prepared chunks (dense and sparse) and upserts them.
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    sparse: Arc<dyn SparseEncoder>,
    batch_size: usize,
    show_progress: bool,
}

impl Indexer {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>, sparse: Arc<dyn SparseEncoder>) -> Self {
        Self { store, embedder, sparse, batch_size: DEFAULT_BATCH, show_progress: false }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn build_points(&self, prepared: &[PreparedChunk]) -> Result<Vec<IndexedPoint>> {
        let texts: Vec<String> = prepared.iter().map(|p| p.search_text.clone()).collect();
        let dense = self.embedder.embed_batch(&texts)?;
        let sparse = self.sparse.embed_sparse(&texts)?;
        if dense.len() != texts.len() || sparse.len() != texts.len() {
            return Err(anyhow!(
                "encoders returned {} dense and {} sparse vectors for {} texts",
                dense.len(),
                sparse.len(),
                texts.len()
            ));
        }
        for d in &dense {
            if d.len() != self.embedder.dim() {
                return Err(anyhow!("dim mismatch: got {} expected {}", d.len(), self.embedder.dim()));
            }
        }
        Ok(prepared
            .iter()
            .zip(dense)
            .zip(sparse)
            .map(|((p, dense), sparse)| IndexedPoint {
                id: p.chunk.point_id(),
                dense,
                sparse,
                payload: Payload::from_prepared(p),
            })
            .collect())
    }

    /// Returns the number of points written.
    pub fn index(&self, prepared: &[PreparedChunk]) -> Result<usize> {
        if prepared.is_empty() {
            info!("no chunks to index");
            return Ok(0);
        }
        let pb = if self.show_progress { ProgressBar::new(prepared.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        let mut written = 0usize;
        for batch in prepared.chunks(self.batch_size) {
            let points = self.build_points(batch)?;
            written += self.store.upsert(&points)?;
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("indexed");
        info!(chunks = written, "indexing completed");
        Ok(written)
    }
}
