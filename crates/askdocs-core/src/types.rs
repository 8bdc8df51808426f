//! Domain types shared by the chunker, the stores, retrieval and the flow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Free-form metadata carried alongside a chunk into the store payload.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Number of characters of `search_text` kept as the payload preview.
pub const CONTEXT_PREVIEW_CHARS: usize = 200;

/// Deterministic point id for the `chunk_index`-th chunk of `source`.
///
/// Re-ingesting the same source yields the same ids, so writes become upserts.
pub fn point_id(source: &str, chunk_index: usize) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, format!("{source}_{chunk_index}").as_bytes())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    #[serde(flatten)]
    pub extra: Meta,
}

/// A bounded piece of a source document, immutable once produced by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn point_id(&self) -> Uuid {
        point_id(&self.metadata.source, self.metadata.chunk_index)
    }
}

/// A chunk plus the text that actually gets embedded.
///
/// `search_text` equals `chunk.text` unless contextual enrichment rewrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChunk {
    pub chunk: Chunk,
    pub search_text: String,
}

impl PreparedChunk {
    pub fn plain(chunk: Chunk) -> Self {
        let search_text = chunk.text.clone();
        Self { chunk, search_text }
    }
}

/// Sparse lexical vector. Indices are strictly ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Builds a vector from unordered `(index, weight)` pairs; repeated indices are summed.
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut merged: BTreeMap<u32, f32> = BTreeMap::new();
        for (index, weight) in weights {
            *merged.entry(index).or_insert(0.0) += weight;
        }
        let (indices, values) = merged.into_iter().unzip();
        Self { indices, values }
    }

    /// Rebuilds a vector from stored columns.
    pub fn from_parts(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::Operation(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(Self::from_weights(indices.into_iter().zip(values)))
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sparse dot product via a merge walk over both index lists.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// What the store keeps next to the vectors of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub display_text: String,
    pub search_text: String,
    pub source: String,
    pub chunk_index: usize,
    pub context_preview: String,
    pub content_hash: String,
    #[serde(flatten)]
    pub extra: Meta,
}

impl Payload {
    pub fn from_prepared(prepared: &PreparedChunk) -> Self {
        let chunk = &prepared.chunk;
        let mut extra = chunk.metadata.extra.clone();
        extra.insert("total_chunks".into(), chunk.metadata.total_chunks.into());
        Self {
            display_text: chunk.text.clone(),
            search_text: prepared.search_text.clone(),
            source: chunk.metadata.source.clone(),
            chunk_index: chunk.metadata.chunk_index,
            context_preview: prepared.search_text.chars().take(CONTEXT_PREVIEW_CHARS).collect(),
            content_hash: blake3::hash(chunk.text.as_bytes()).to_hex().to_string(),
            extra,
        }
    }

    /// Text handed to relevance judges and to generation.
    pub fn passage_text(&self) -> String {
        if !self.search_text.is_empty() {
            self.search_text.clone()
        } else if !self.context_preview.is_empty() {
            format!("{}\n{}", self.context_preview, self.display_text)
        } else {
            self.display_text.clone()
        }
    }

    /// JSON view that filter predicates are evaluated against.
    pub fn filter_view(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub id: Uuid,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub payload: Payload,
}

/// One retrieved item. `score` is a similarity, an RRF score, or a judge score
/// depending on the stage that produced it; higher is always better.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    pub id: Uuid,
    pub seq: Option<u64>,
    pub payload: Payload,
    pub score: f32,
}

/// A row fetched by its sequential id for window merging.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqRecord {
    pub seq: u64,
    pub content: String,
    pub source: String,
}
