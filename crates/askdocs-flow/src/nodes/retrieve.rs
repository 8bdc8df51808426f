use askdocs_core::traits::SearchEngine;
use tracing::info;

use crate::state::{Fallback, GraphState, Node};

pub fn retrieve(state: &mut GraphState, engine: &dyn SearchEngine, limit: usize) {
    state.enter(Node::Retrieve);
    match engine.query(&state.question, state.filter.as_ref(), limit) {
        Ok(documents) => {
            info!(hits = documents.len(), "retrieved documents");
            state.documents = documents;
        }
        Err(e) => {
            state.documents.clear();
            state.fall_back(Fallback::RetrievalFailed, &e);
        }
    }
}
