#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use askdocs_core::filter::SearchFilter;
use askdocs_core::traits::{CompletionRequest, LanguageModel, SearchEngine};
use askdocs_core::types::{Chunk, ChunkMetadata, Meta, Payload, PreparedChunk, RetrievalCandidate};

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;

/// Model whose replies are computed from the request.
pub struct ScriptedModel {
    name: &'static str,
    respond: Responder,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(name: &'static str, respond: impl Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self { name, respond: Box::new(respond), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_with(&self, system: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.system == system).count()
    }
}

impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        self.name
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

pub fn yes() -> Result<String> {
    Ok(r#"{"binary_score": "yes"}"#.into())
}

pub fn no() -> Result<String> {
    Ok(r#"{"binary_score": "no"}"#.into())
}

pub fn route(datasource: &str) -> Result<String> {
    Ok(format!(r#"<think>deciding</think>{{"datasource": "{datasource}"}}"#))
}

pub fn down() -> Result<String> {
    Err(anyhow!("model unavailable"))
}

pub struct StaticEngine {
    docs: Vec<RetrievalCandidate>,
    fail: bool,
    calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl StaticEngine {
    pub fn returning(docs: Vec<RetrievalCandidate>) -> Self {
        Self { docs, fail: false, calls: AtomicUsize::new(0), queries: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { docs: Vec::new(), fail: true, calls: AtomicUsize::new(0), queries: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchEngine for StaticEngine {
    fn query(&self, query: &str, _filter: Option<&SearchFilter>, limit: usize) -> Result<Vec<RetrievalCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(anyhow!("store offline"));
        }
        Ok(self.docs.iter().take(limit).cloned().collect())
    }
}

pub fn doc(source: &str, idx: usize, text: &str) -> RetrievalCandidate {
    let chunk = Chunk {
        text: text.to_string(),
        metadata: ChunkMetadata { source: source.into(), chunk_index: idx, total_chunks: 1, extra: Meta::new() },
    };
    let prepared = PreparedChunk::plain(chunk);
    RetrievalCandidate {
        id: prepared.chunk.point_id(),
        seq: None,
        payload: Payload::from_prepared(&prepared),
        score: 1.0,
    }
}

pub fn library() -> Vec<RetrievalCandidate> {
    vec![
        doc("solar.txt", 0, "Batteries should never discharge below half capacity."),
        doc("solar.txt", 1, "Clean the solar panels monthly."),
    ]
}
