//! askdocs-core
//!
//! Domain types, collaborator traits, configuration and the chunker shared by
//! every other `askdocs` crate. Nothing in here talks to a model or a database.

pub mod chunking;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod filter;
pub mod traits;
pub mod types;
