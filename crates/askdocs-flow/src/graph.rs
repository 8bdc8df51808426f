//! The flow controller: a bounded state machine over the nodes.
//!
//! ```text
//! classify_query      -> generate (direct) | rewrite_query
//! rewrite_query       -> retrieve -> grade_documents
//! grade_documents     -> generate (docs kept) | rewrite_query
//! generate            -> hallucination_check | end (direct)
//! hallucination_check -> end (useful) | rewrite_query | generate
//! ```
//!
//! Every loop-back edge spends one attempt. With no attempts left the loop is
//! not taken and the run ends as [`FlowStatus::Exhausted`].

use std::sync::Arc;

use askdocs_core::config::AppConfig;
use askdocs_core::filter::SearchFilter;
use askdocs_core::traits::{LanguageModel, SearchEngine};
use tracing::{info, warn};

use crate::nodes;
use crate::state::{Classification, FlowStatus, Grade, GraphState, Node};

pub struct FlowController {
    engine: Arc<dyn SearchEngine>,
    fast: Arc<dyn LanguageModel>,
    smart: Arc<dyn LanguageModel>,
    limit: usize,
    max_attempts: u32,
}

impl FlowController {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        fast: Arc<dyn LanguageModel>,
        smart: Arc<dyn LanguageModel>,
        limit: usize,
        max_attempts: u32,
    ) -> Self {
        Self { engine, fast, smart, limit, max_attempts }
    }

    pub fn from_config(
        engine: Arc<dyn SearchEngine>,
        fast: Arc<dyn LanguageModel>,
        smart: Arc<dyn LanguageModel>,
        cfg: &AppConfig,
    ) -> Self {
        Self::new(engine, fast, smart, cfg.retrieval.limit, cfg.flow.max_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn run(&self, question: &str) -> GraphState {
        self.run_filtered(question, None)
    }

    pub fn run_filtered(&self, question: &str, filter: Option<SearchFilter>) -> GraphState {
        let mut state = GraphState::new(question).with_filter(filter);
        info!(question, "flow started");
        let mut next = Node::ClassifyQuery;
        loop {
            next = match next {
                Node::ClassifyQuery => match nodes::classify_query(&mut state, self.fast.as_ref()) {
                    Classification::DirectAnswer => Node::Generate,
                    Classification::NeedsRetrieval => Node::RewriteQuery,
                },
                Node::RewriteQuery => {
                    nodes::rewrite_query(&mut state, self.fast.as_ref());
                    Node::Retrieve
                }
                Node::Retrieve => {
                    nodes::retrieve(&mut state, self.engine.as_ref(), self.limit);
                    Node::GradeDocuments
                }
                Node::GradeDocuments => {
                    nodes::grade_documents(&mut state, self.fast.as_ref());
                    if !state.documents.is_empty() {
                        Node::Generate
                    } else if self.loop_back(&mut state, Node::RewriteQuery) {
                        Node::RewriteQuery
                    } else {
                        nodes::generate(&mut state, self.smart.as_ref());
                        state.status = FlowStatus::Exhausted;
                        break;
                    }
                }
                Node::Generate => {
                    nodes::generate(&mut state, self.smart.as_ref());
                    if !state.is_retrieval_route() {
                        state.status = FlowStatus::Direct;
                        break;
                    }
                    Node::HallucinationCheck
                }
                Node::HallucinationCheck => match nodes::hallucination_check(&mut state, self.fast.as_ref()) {
                    Grade::Useful => {
                        state.status = FlowStatus::Answered;
                        break;
                    }
                    Grade::NotUseful if self.loop_back(&mut state, Node::RewriteQuery) => Node::RewriteQuery,
                    Grade::Hallucination if self.loop_back(&mut state, Node::Generate) => Node::Generate,
                    Grade::NotUseful | Grade::Hallucination => {
                        state.status = FlowStatus::Exhausted;
                        break;
                    }
                },
            };
        }
        info!(status = ?state.status, attempts = state.attempts, trace = %state.trace(), "flow finished");
        state
    }

    /// Spends an attempt on a loop-back edge, or refuses when none are left.
    fn loop_back(&self, state: &mut GraphState, target: Node) -> bool {
        if state.attempts >= self.max_attempts {
            warn!(attempts = state.attempts, %target, "attempt limit reached, not looping back");
            return false;
        }
        state.attempts += 1;
        true
    }
}
