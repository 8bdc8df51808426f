//! askdocs-llm
//!
//! Language-model plumbing: the Ollama chat client, structured-output helpers,
//! the HTTP cross-encoder judge and ingestion-time contextual enrichment.

pub mod enrich;
pub mod ollama;
pub mod rerank_http;
pub mod structured;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use askdocs_core::config::{LlmConfig, RetrievalConfig};
use askdocs_core::error::Error;
use askdocs_core::traits::{LanguageModel, RelevanceJudge};
use askdocs_hybrid::KeywordOverlapJudge;
use tracing::info;

pub use enrich::{clean_context, compose_search_text, neighbor_contexts, ContextEnricher};
pub use ollama::OllamaClient;
pub use rerank_http::HttpRerankJudge;
pub use structured::{extract_json_object, invoke_structured, invoke_text, strip_reasoning};

const RERANK_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the chat client for one model role.
pub fn language_model(cfg: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match cfg.provider.to_ascii_lowercase().as_str() {
        "ollama" => {
            info!(model = %cfg.model, base_url = %cfg.base_url, "using Ollama model");
            Ok(Arc::new(OllamaClient::new(cfg)?))
        }
        other => Err(Error::InvalidConfig(format!("unknown llm provider '{other}'")).into()),
    }
}

/// HTTP cross-encoder when `rerank_url` is set, keyword overlap otherwise.
pub fn relevance_judge(cfg: &RetrievalConfig) -> Result<Arc<dyn RelevanceJudge>> {
    match cfg.rerank_url.as_deref() {
        Some(url) => {
            info!(url, "using HTTP reranker");
            Ok(Arc::new(HttpRerankJudge::new(url, RERANK_TIMEOUT)?))
        }
        None => Ok(Arc::new(KeywordOverlapJudge::new())),
    }
}
