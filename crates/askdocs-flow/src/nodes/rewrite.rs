use anyhow::anyhow;
use askdocs_core::traits::LanguageModel;
use askdocs_llm::invoke_text;
use tracing::info;

use crate::prompts;
use crate::state::{Fallback, GraphState, Node};

pub fn rewrite_query(state: &mut GraphState, fast: &dyn LanguageModel) {
    state.enter(Node::RewriteQuery);
    match invoke_text(fast, prompts::REWRITE_SYSTEM, &prompts::rewrite_user(&state.question)) {
        Ok(better) => {
            let better = better.trim_matches(|c| c == '"' || c == '\'').trim().to_string();
            if better.is_empty() {
                state.fall_back(Fallback::RewritePassthrough, &anyhow!("rewrite reply was empty"));
                return;
            }
            info!(from = %state.question, to = %better, "query rewritten");
            state.question = better;
        }
        Err(e) => state.fall_back(Fallback::RewritePassthrough, &e),
    }
}
