//! Wiring for the `askdocs` binary: argument parsing and the service graph
//! built once from the loaded configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use askdocs_core::chunking::Chunker;
use askdocs_core::config::{resolve_with_base, AppConfig, StoreKind};
use askdocs_core::data_processor::DataProcessor;
use askdocs_core::traits::{DocumentStore, Embedder, SparseEncoder};
use askdocs_core::types::PreparedChunk;
use askdocs_embed::{get_default_embedder, token_codec};
use askdocs_flow::FlowController;
use askdocs_hybrid::{HybridSearchEngine, Indexer, Reranker, WindowMerger};
use askdocs_llm::{language_model, relevance_judge, ContextEnricher};
use askdocs_text::LexicalSparseEncoder;
use askdocs_vector::open_store;
use tracing::{info, warn};

pub const USAGE: &str = "Usage: askdocs <command>\n\
\n\
Commands:\n\
  ingest [DIR]                          chunk, embed and store documents\n\
  search <query> [--limit N] [--window N]  hybrid search\n\
  ask                                   interactive question answering";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ingest { dir: Option<PathBuf> },
    Search { query: String, limit: Option<usize>, window: Option<u64> },
    Ask,
    Help,
}

fn flag_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T> {
    let Some(raw) = value else { bail!("{flag} requires a number") };
    raw.parse().map_err(|_| anyhow::anyhow!("{flag} requires a number, got '{raw}'"))
}

/// Parses the arguments after the program name.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Command> {
    let mut args = args.into_iter();
    let Some(cmd) = args.next() else { return Ok(Command::Help) };
    match cmd.as_str() {
        "ingest" => Ok(Command::Ingest { dir: args.find(|a| !a.starts_with('-')).map(PathBuf::from) }),
        "search" => {
            let mut words = Vec::new();
            let (mut limit, mut window) = (None, None);
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--limit" | "-n" => limit = Some(flag_value("--limit", args.next())?),
                    "--window" | "-w" => window = Some(flag_value("--window", args.next())?),
                    _ => words.push(arg),
                }
            }
            if words.is_empty() {
                bail!("search needs a query\n\n{USAGE}");
            }
            Ok(Command::Search { query: words.join(" "), limit, window })
        }
        "ask" => Ok(Command::Ask),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
}

/// Long-lived handles shared by every command.
pub struct App {
    cfg: AppConfig,
    base: PathBuf,
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    sparse: Arc<dyn SparseEncoder>,
}

impl App {
    pub fn new(cfg: AppConfig, base: &Path) -> Result<Self> {
        let embedder = get_default_embedder(&cfg.embedding).context("loading embedder")?;
        let store = open_store(&cfg.store, embedder.dim()).context("opening store")?;
        let sparse = Arc::new(LexicalSparseEncoder::from_config(&cfg.embedding));
        Ok(Self { cfg, base: base.to_path_buf(), store, embedder, sparse })
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn input_dir(&self) -> PathBuf {
        resolve_with_base(&self.base, &self.cfg.data.input_dir)
    }

    /// Chunks, optionally enriches, embeds and upserts every document in `dir`.
    pub fn ingest(&self, dir: Option<&Path>, progress: bool) -> Result<usize> {
        let dir = dir.map_or_else(|| self.input_dir(), Path::to_path_buf);
        info!(dir = %dir.display(), "ingesting");
        let chunker = Chunker::from_config(&self.cfg.chunking, token_codec(&self.cfg.chunking)?)?;
        let chunks = DataProcessor::new().process_directory(&dir, &chunker)?;
        info!(chunks = chunks.len(), "documents chunked");

        let prepared = if self.cfg.enrichment.enabled {
            let fast = language_model(&self.cfg.llm.fast)?;
            let enricher = ContextEnricher::new(fast, &self.cfg.enrichment);
            tokio::runtime::Runtime::new()?.block_on(enricher.enrich(chunks))
        } else {
            chunks.into_iter().map(PreparedChunk::plain).collect()
        };

        Indexer::new(self.store.clone(), self.embedder.clone(), self.sparse.clone())
            .with_progress(progress)
            .index(&prepared)
    }

    /// The in-memory store starts empty in every process; fill it from the
    /// configured input directory before querying.
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.cfg.store.kind == StoreKind::Memory && self.store.is_empty()? {
            warn!("in-memory store is empty, ingesting the input directory first");
            self.ingest(None, false)?;
        }
        Ok(())
    }

    /// Search engine, with window merging of `window` following records when given.
    pub fn engine(&self, window: Option<u64>) -> Result<HybridSearchEngine> {
        let reranker = Reranker::new(relevance_judge(&self.cfg.retrieval)?);
        let engine = HybridSearchEngine::new(
            self.store.clone(),
            self.embedder.clone(),
            self.sparse.clone(),
            reranker,
            &self.cfg.retrieval,
        );
        Ok(match window {
            Some(size) => engine.with_window(WindowMerger::new(self.store.clone(), &self.cfg.retrieval.window), size),
            None => engine,
        })
    }

    pub fn flow(&self) -> Result<FlowController> {
        let fast = language_model(&self.cfg.llm.fast)?;
        let smart = language_model(&self.cfg.llm.smart)?;
        Ok(FlowController::from_config(Arc::new(self.engine(None)?), fast, smart, &self.cfg))
    }
}
