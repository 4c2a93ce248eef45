//! Seams to the outside world. The workflow only talks to these traits;
//! [`crate::tools`] has HTTP-backed and in-memory implementations.
//!
//! Every classifier answers with a plain `bool` (or [`DataSource`]); callers
//! never see the "yes"/"no" strings a model might produce.

use crate::state::Document;
use crate::step::StepError;
use serde::{Deserialize, Serialize};

/// Maps a question to ranked documents from the indexed corpus.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, question: &str) -> Result<Vec<Document>, StepError>;
}

/// One result from a live web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl SearchHit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: None,
        }
    }
}

pub trait WebSearch: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, StepError>;
}

/// Writes an answer to `question` using `context` as its only source.
pub trait Generator: Send + Sync {
    fn generate(&self, question: &str, context: &[Document]) -> Result<String, StepError>;
}

/// Where a question should be answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// The indexed corpus.
    Vectorstore,
    /// Live web search.
    Websearch,
}

pub trait QuestionRouter: Send + Sync {
    fn route_question(&self, question: &str) -> Result<DataSource, StepError>;
}

pub trait RelevanceGrader: Send + Sync {
    fn is_relevant(&self, question: &str, document: &str) -> Result<bool, StepError>;
}

/// Is the generation supported by the documents?
pub trait HallucinationGrader: Send + Sync {
    fn is_grounded(&self, documents: &[Document], generation: &str) -> Result<bool, StepError>;
}

/// Does the generation resolve the question?
pub trait AnswerGrader: Send + Sync {
    fn addresses_question(&self, question: &str, generation: &str) -> Result<bool, StepError>;
}
