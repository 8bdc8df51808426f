//! One function per flow node. Each appends its name to the trace first and
//! absorbs collaborator failures into a recorded fallback.

mod check;
mod classify;
mod generate;
mod grade;
mod retrieve;
mod rewrite;

pub use check::hallucination_check;
pub use classify::classify_query;
pub use generate::generate;
pub use grade::grade_documents;
pub use retrieve::retrieve;
pub use rewrite::rewrite_query;

use askdocs_core::types::RetrievalCandidate;

/// Passage texts joined the way the prompts expect them.
pub(crate) fn joined_passages(documents: &[RetrievalCandidate]) -> String {
    documents.iter().map(|d| d.payload.passage_text()).collect::<Vec<_>>().join("\n\n")
}
