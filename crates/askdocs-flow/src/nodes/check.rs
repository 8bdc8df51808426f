use askdocs_core::traits::LanguageModel;
use askdocs_llm::invoke_structured;
use tracing::info;

use super::joined_passages;
use crate::prompts::{self, BinaryScore};
use crate::state::{Fallback, Grade, GraphState, Node};

/// Groundedness first, then answer relevance only for grounded generations.
/// Failed judgments default to grounded and useful.
pub fn hallucination_check(state: &mut GraphState, fast: &dyn LanguageModel) -> Grade {
    state.enter(Node::HallucinationCheck);
    let generation = state.answer().to_string();

    let facts = joined_passages(&state.documents);
    let grounded = match invoke_structured::<BinaryScore>(
        fast,
        prompts::GROUNDED_SYSTEM,
        &prompts::grounded_user(&facts, &generation),
        prompts::binary_schema(),
    ) {
        Ok(score) => score.is_yes(),
        Err(e) => {
            state.fall_back(Fallback::GroundednessDefaulted, &e);
            true
        }
    };

    let grade = if grounded {
        match invoke_structured::<BinaryScore>(
            fast,
            prompts::ANSWER_SYSTEM,
            &prompts::answer_user(&state.question, &generation),
            prompts::binary_schema(),
        ) {
            Ok(score) if score.is_yes() => Grade::Useful,
            Ok(_) => Grade::NotUseful,
            Err(e) => {
                state.fall_back(Fallback::AnswerRelevanceDefaulted, &e);
                Grade::Useful
            }
        }
    } else {
        Grade::Hallucination
    };
    info!(?grade, "generation checked");
    state.grade = Some(grade);
    grade
}
