//! askdocs-flow
//!
//! Question answering as a small state machine: classify, rewrite, retrieve,
//! grade, generate and check, looping back on failure under an attempt bound.

pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod state;

pub use graph::FlowController;
pub use state::{Classification, Fallback, FlowStatus, Grade, GraphState, Node, Relevance};
