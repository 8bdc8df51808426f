//! askdocs-vector
//!
//! Storage variants behind `askdocs_core::traits::DocumentStore`: an
//! in-process store and a LanceDB table. `open_store` picks one from config.

pub mod lance;
pub mod memory;
pub mod pushdown;
pub mod ranking;
pub mod schema;
pub mod table;

use std::sync::Arc;

use anyhow::Result;
use askdocs_core::config::{StoreConfig, StoreKind};
use askdocs_core::traits::DocumentStore;
use tracing::info;

pub use lance::LanceStore;
pub use memory::MemoryStore;
pub use pushdown::LanceFilter;

pub fn open_store(cfg: &StoreConfig, dim: usize) -> Result<Arc<dyn DocumentStore>> {
    match cfg.kind {
        StoreKind::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Lance => Ok(Arc::new(LanceStore::open(&cfg.resolved_path(), &cfg.table, dim)?)),
    }
}
