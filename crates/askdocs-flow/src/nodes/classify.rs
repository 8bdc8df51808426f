use askdocs_core::traits::LanguageModel;
use askdocs_llm::invoke_structured;
use tracing::info;

use crate::prompts::{self, Datasource, RouteQuery};
use crate::state::{Classification, Fallback, GraphState, Node};

pub fn classify_query(state: &mut GraphState, fast: &dyn LanguageModel) -> Classification {
    state.enter(Node::ClassifyQuery);
    let route = invoke_structured::<RouteQuery>(fast, prompts::CLASSIFY_SYSTEM, &state.question, prompts::route_schema());
    let classification = match route {
        Ok(RouteQuery { datasource: Datasource::VectorStore }) => Classification::NeedsRetrieval,
        Ok(RouteQuery { datasource: Datasource::Generate }) => Classification::DirectAnswer,
        Err(e) => {
            state.fall_back(Fallback::ClassificationDefaulted, &e);
            Classification::NeedsRetrieval
        }
    };
    info!(?classification, "query classified");
    state.classification = Some(classification);
    classification
}
