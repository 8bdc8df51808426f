//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge serialized defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__LIMIT=8`). Provides helpers to expand `~` and `${VAR}` and
//! to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Loads `config.toml` and the env-specific overlay from `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    /// Wraps an already assembled figment, layered over the defaults.
    pub fn from_figment(figment: Figment) -> Self {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(figment);
        Self { figment, env_name: "test".into() }
    }

    /// Parses TOML text over the defaults.
    pub fn from_toml_str(toml: &str) -> Self {
        Self::from_figment(Figment::from(Toml::string(toml)))
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts and validates the full typed settings.
    pub fn settings(&self) -> anyhow::Result<AppConfig> {
        let settings: AppConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmRoles,
    pub enrichment: EnrichmentConfig,
    pub flow: FlowConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));
        if self.chunking.chunk_size == 0 {
            return invalid("chunking.chunk_size must be positive");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid("chunking.chunk_overlap must be smaller than chunking.chunk_size");
        }
        if self.embedding.dim == 0 || self.embedding.sparse_vocab_size == 0 {
            return invalid("embedding.dim and embedding.sparse_vocab_size must be positive");
        }
        if self.retrieval.limit == 0 || self.retrieval.candidate_multiplier == 0 {
            return invalid("retrieval.limit and retrieval.candidate_multiplier must be positive");
        }
        if self.enrichment.batch_size == 0 {
            return invalid("enrichment.batch_size must be positive");
        }
        if self.flow.max_attempts == 0 {
            return invalid("flow.max_attempts must be positive");
        }
        if self.store.table.trim().is_empty() {
            return invalid("store.table must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub input_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { input_dir: "data/docs".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// `tokenizer.json` used for counting; whitespace words when unset.
    pub tokenizer_path: Option<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 100, tokenizer_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub dim: usize,
    pub max_len: usize,
    pub sparse_vocab_size: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model_dir: None, use_fake: false, dim: 1024, max_len: 256, sparse_vocab_size: 250_002 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Lance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub path: String,
    pub table: String,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { kind: StoreKind::Memory, path: "~/.askdocs/lancedb".into(), table: "chunks".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub enabled: bool,
    /// Number of following records merged after each hit.
    pub size: u64,
    pub overlap_hint: usize,
    pub min_overlap: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { enabled: false, size: 3, overlap_hint: 200, min_overlap: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub limit: usize,
    pub candidate_multiplier: usize,
    pub window: WindowConfig,
    /// Base URL of an HTTP cross-encoder; keyword overlap is used when unset.
    pub rerank_url: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { limit: 5, candidate_multiplier: 3, window: WindowConfig::default(), rerank_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "qwen3:4b".into(),
            base_url: "http://localhost:11434".into(),
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

/// The cheap model routes and grades; the smart one writes answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmRoles {
    pub fast: LlmConfig,
    pub smart: LlmConfig,
}

impl Default for LlmRoles {
    fn default() -> Self {
        Self {
            fast: LlmConfig::default(),
            smart: LlmConfig { model: "qwen3:14b".into(), ..LlmConfig::default() },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub batch_size: usize,
    pub pause_ms: u64,
    pub neighbor_window: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { enabled: false, batch_size: 10, pause_ms: 1000, neighbor_window: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub max_attempts: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
