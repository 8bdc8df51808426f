use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use askdocs_core::filter::Predicate;
use askdocs_core::traits::{SequentialStore, VectorStore};
use askdocs_core::types::{IndexedPoint, RetrievalCandidate, SeqRecord, SparseVector};
use tracing::debug;
use uuid::Uuid;

use crate::ranking::{dot, top_k};

struct Row {
    seq: u64,
    point: IndexedPoint,
}

#[derive(Default)]
struct Inner {
    rows: Vec<Row>,
    by_id: HashMap<Uuid, usize>,
}

/// Process-local store. Rows are never removed, so `seq` is the 1-based insertion position.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn search<F>(&self, filter: Option<&Predicate>, k: usize, score: F) -> Result<Vec<RetrievalCandidate>>
    where
        F: Fn(&IndexedPoint) -> f32,
    {
        let inner = self.inner.read().map_err(|_| anyhow!("memory store lock poisoned"))?;
        let scored: Vec<(f32, &Row)> = inner
            .rows
            .iter()
            .filter(|row| filter.map_or(true, |p| p.matches(&row.point.payload.filter_view())))
            .map(|row| (score(&row.point), row))
            .collect();
        Ok(top_k(scored, k)
            .into_iter()
            .map(|(score, row)| RetrievalCandidate {
                id: row.point.id,
                seq: Some(row.seq),
                payload: row.point.payload.clone(),
                score,
            })
            .collect())
    }
}

impl VectorStore for MemoryStore {
    fn upsert(&self, points: &[IndexedPoint]) -> Result<usize> {
        let mut guard = self.inner.write().map_err(|_| anyhow!("memory store lock poisoned"))?;
        let inner = &mut *guard;
        for point in points {
            if let Some(&i) = inner.by_id.get(&point.id) {
                inner.rows[i].point = point.clone();
                continue;
            }
            let seq = inner.rows.len() as u64 + 1;
            inner.by_id.insert(point.id, inner.rows.len());
            inner.rows.push(Row { seq, point: point.clone() });
        }
        debug!(points = points.len(), total = inner.rows.len(), "memory upsert");
        Ok(points.len())
    }

    fn search_dense(&self, query: &[f32], filter: Option<&Predicate>, k: usize) -> Result<Vec<RetrievalCandidate>> {
        self.search(filter, k, |p| dot(&p.dense, query))
    }

    fn search_sparse(&self, query: &SparseVector, filter: Option<&Predicate>, k: usize) -> Result<Vec<RetrievalCandidate>> {
        self.search(filter, k, |p| p.sparse.dot(query))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.inner.read().map_err(|_| anyhow!("memory store lock poisoned"))?.rows.len())
    }
}

impl SequentialStore for MemoryStore {
    fn fetch_by_seq(&self, seqs: &[u64]) -> Result<Vec<SeqRecord>> {
        let inner = self.inner.read().map_err(|_| anyhow!("memory store lock poisoned"))?;
        let mut wanted: Vec<u64> = seqs.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .into_iter()
            .filter(|&seq| seq >= 1)
            .filter_map(|seq| inner.rows.get((seq - 1) as usize))
            .map(|row| SeqRecord {
                seq: row.seq,
                content: row.point.payload.display_text.clone(),
                source: row.point.payload.source.clone(),
            })
            .collect())
    }
}
