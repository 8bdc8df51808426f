//! Prompt templates and the JSON schemas for structured replies.

use serde::Deserialize;
use serde_json::{json, Value};

pub const CLASSIFY_SYSTEM: &str = "You are an expert at routing a user question to a vector store or directly to generation.\n\
- Use 'vector_store' for questions about specific facts, numbers, clauses or lookups (e.g. \"What is the deductible?\", \"How do I reset my password?\").\n\
- Use 'generate' for greetings, compliments or questions that need no external knowledge (e.g. \"Hello\", \"Thanks\", \"Who are you?\").";

pub const REWRITE_SYSTEM: &str = "You are a question re-writer that converts an input question to a better version optimized \
for vector store retrieval. Reason about the underlying semantic intent. Reply with the improved question only.";

pub const GRADE_SYSTEM: &str = "You are a grader assessing relevance of a retrieved document to a user question.\n\
If the document contains keywords or semantic meaning useful for answering the question, grade it as relevant. \
It does not need to be a stringent test; the goal is to filter out erroneous retrievals.\n\
Give a binary score 'yes' or 'no' to indicate whether the document is relevant to the question.";

pub const GENERATE_SYSTEM: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.";

pub const DIRECT_SYSTEM: &str = "You are a friendly assistant for a private document library. \
Reply briefly to the user's message.";

pub const GROUNDED_SYSTEM: &str = "You are a grader assessing whether an LLM generation is grounded in and supported by a set of retrieved facts.\n\
Give a binary score 'yes' or 'no'. 'yes' means the answer is grounded in and supported by the facts.";

pub const ANSWER_SYSTEM: &str = "You are a grader assessing whether an answer addresses and resolves a question.\n\
Give a binary score 'yes' or 'no'. 'yes' means the answer resolves the question.";

/// Emitted on the retrieval route when no document survives grading.
pub const NO_CONTEXT_ANSWER: &str = "I don't know. No relevant documents were found for this question.";

pub const APOLOGY: &str = "Sorry, I could not generate an answer due to an internal error.";

pub fn rewrite_user(question: &str) -> String {
    format!("Here is the initial question:\n\n{question}\n\nFormulate an improved question.")
}

pub fn grade_user(document: &str, question: &str) -> String {
    format!("Retrieved document:\n\n{document}\n\nUser question: {question}")
}

pub fn generate_user(question: &str, context: &str) -> String {
    format!("Question: {question}\n\nContext: {context}\n\nAnswer:")
}

pub fn grounded_user(facts: &str, generation: &str) -> String {
    format!("Set of facts:\n\n{facts}\n\nLLM generation: {generation}")
}

pub fn answer_user(question: &str, generation: &str) -> String {
    format!("User question:\n\n{question}\n\nLLM generation: {generation}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datasource {
    VectorStore,
    Generate,
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub datasource: Datasource,
}

/// `{"binary_score": "yes" | "no"}`.
#[derive(Debug, Deserialize)]
pub struct BinaryScore {
    pub binary_score: String,
}

impl BinaryScore {
    pub fn is_yes(&self) -> bool {
        self.binary_score.trim().eq_ignore_ascii_case("yes")
    }
}

pub fn route_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "datasource": { "type": "string", "enum": ["vector_store", "generate"] }
        },
        "required": ["datasource"]
    })
}

pub fn binary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "binary_score": { "type": "string", "enum": ["yes", "no"] }
        },
        "required": ["binary_score"]
    })
}
