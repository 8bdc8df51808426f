use askdocs_core::traits::LanguageModel;
use askdocs_llm::invoke_structured;
use tracing::{debug, info, warn};

use crate::prompts::{self, BinaryScore};
use crate::state::{Fallback, GraphState, Node, Relevance};

/// Drops documents graded irrelevant or whose grading call failed. When no
/// call succeeds at all the grader is treated as unusable and every document
/// passes.
pub fn grade_documents(state: &mut GraphState, fast: &dyn LanguageModel) {
    state.enter(Node::GradeDocuments);
    let documents = std::mem::take(&mut state.documents);
    let total = documents.len();
    let mut kept = Vec::with_capacity(total);
    let mut last_error = None;
    let mut failures = 0usize;

    for doc in &documents {
        let user = prompts::grade_user(&doc.payload.passage_text(), &state.question);
        match invoke_structured::<BinaryScore>(fast, prompts::GRADE_SYSTEM, &user, prompts::binary_schema()) {
            Ok(score) => {
                let relevance = if score.is_yes() { Relevance::Relevant } else { Relevance::Irrelevant };
                debug!(id = %doc.id, ?relevance, "document graded");
                if relevance == Relevance::Relevant {
                    kept.push(doc.clone());
                }
            }
            Err(e) => {
                warn!(id = %doc.id, error = %e, "grading call failed, dropping document");
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if failures == total => {
            state.fall_back(Fallback::GradingFailOpen, &e);
            state.documents = documents;
        }
        Some(e) => {
            state.fall_back(Fallback::GradeCallDropped, &e);
            state.documents = kept;
        }
        None => state.documents = kept,
    }
    info!(graded = total, retained = state.documents.len(), "documents graded");
}
