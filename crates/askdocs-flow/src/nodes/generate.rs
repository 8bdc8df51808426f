use askdocs_core::traits::LanguageModel;
use askdocs_llm::invoke_text;
use tracing::info;

use super::joined_passages;
use crate::prompts;
use crate::state::{Fallback, GraphState, Node};

/// On the retrieval route with nothing to ground on, the fixed no-context
/// answer is emitted without calling the model.
pub fn generate(state: &mut GraphState, smart: &dyn LanguageModel) {
    state.enter(Node::Generate);
    let reply = if state.is_retrieval_route() {
        if state.documents.is_empty() {
            info!("no documents to answer from");
            state.generation = Some(prompts::NO_CONTEXT_ANSWER.to_string());
            return;
        }
        let context = joined_passages(&state.documents);
        invoke_text(smart, prompts::GENERATE_SYSTEM, &prompts::generate_user(&state.question, &context))
    } else {
        invoke_text(smart, prompts::DIRECT_SYSTEM, &state.question)
    };
    match reply {
        Ok(answer) => {
            info!(chars = answer.len(), "answer generated");
            state.generation = Some(answer);
        }
        Err(e) => {
            state.fall_back(Fallback::GenerationFailed, &e);
            state.generation = Some(prompts::APOLOGY.to_string());
        }
    }
}
