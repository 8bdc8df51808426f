//! Per-query state threaded through the flow and the closed decision types.

use std::fmt;

use askdocs_core::filter::SearchFilter;
use askdocs_core::types::RetrievalCandidate;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    ClassifyQuery,
    RewriteQuery,
    Retrieve,
    GradeDocuments,
    Generate,
    HallucinationCheck,
}

impl Node {
    pub const fn name(self) -> &'static str {
        match self {
            Node::ClassifyQuery => "classify_query",
            Node::RewriteQuery => "rewrite_query",
            Node::Retrieve => "retrieve",
            Node::GradeDocuments => "grade_documents",
            Node::Generate => "generate",
            Node::HallucinationCheck => "hallucination_check",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    NeedsRetrieval,
    DirectAnswer,
}

/// Per-document verdict from the relevance grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    Relevant,
    Irrelevant,
}

/// Verdict of the hallucination check on a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Useful,
    NotUseful,
    Hallucination,
}

/// A collaborator failure that was absorbed by a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    ClassificationDefaulted,
    RewritePassthrough,
    RetrievalFailed,
    /// Every grading call failed; documents kept ungated.
    GradingFailOpen,
    /// Some grading calls failed; those documents were dropped.
    GradeCallDropped,
    GenerationFailed,
    GroundednessDefaulted,
    AnswerRelevanceDefaulted,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fallback::ClassificationDefaulted => "classification defaulted to retrieval",
            Fallback::RewritePassthrough => "rewrite passed the question through",
            Fallback::RetrievalFailed => "retrieval failed",
            Fallback::GradingFailOpen => "grading failed open",
            Fallback::GradeCallDropped => "grading call failed, document dropped",
            Fallback::GenerationFailed => "generation failed",
            Fallback::GroundednessDefaulted => "groundedness defaulted to grounded",
            Fallback::AnswerRelevanceDefaulted => "answer relevance defaulted to useful",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Running,
    /// Generation passed the hallucination check.
    Answered,
    /// Answered without retrieval.
    Direct,
    /// Loop bound reached; the answer is best effort.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct GraphState {
    pub original_question: String,
    /// Current, possibly rewritten, question.
    pub question: String,
    pub filter: Option<SearchFilter>,
    pub generation: Option<String>,
    pub documents: Vec<RetrievalCandidate>,
    pub attempts: u32,
    pub classification: Option<Classification>,
    pub grade: Option<Grade>,
    pub error: Option<String>,
    pub fallbacks: Vec<Fallback>,
    pub status: FlowStatus,
    steps: Vec<Node>,
}

impl GraphState {
    pub fn new(question: &str) -> Self {
        Self {
            original_question: question.to_string(),
            question: question.to_string(),
            filter: None,
            generation: None,
            documents: Vec::new(),
            attempts: 0,
            classification: None,
            grade: None,
            error: None,
            fallbacks: Vec::new(),
            status: FlowStatus::Running,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<SearchFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Appends a node to the trace. The trace never shrinks.
    pub fn enter(&mut self, node: Node) {
        self.steps.push(node);
    }

    pub fn steps(&self) -> &[Node] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|n| n.name()).collect()
    }

    pub fn trace(&self) -> String {
        self.step_names().join(" -> ")
    }

    pub fn visits(&self, node: Node) -> usize {
        self.steps.iter().filter(|&&n| n == node).count()
    }

    pub fn has_fallback(&self, fallback: Fallback) -> bool {
        self.fallbacks.contains(&fallback)
    }

    pub fn answer(&self) -> &str {
        self.generation.as_deref().unwrap_or_default()
    }

    /// Records an absorbed failure: flag, last error and a warning.
    pub fn fall_back(&mut self, fallback: Fallback, err: &anyhow::Error) {
        warn!(error = %err, %fallback, question = %self.question, "collaborator failure absorbed");
        self.error = Some(format!("{fallback}: {err:#}"));
        self.fallbacks.push(fallback);
    }

    pub fn is_retrieval_route(&self) -> bool {
        self.classification != Some(Classification::DirectAnswer)
    }
}
