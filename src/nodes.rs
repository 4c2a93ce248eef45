//! The four steps of the answering graph. Each reads the state, calls one
//! collaborator, and returns a [`StateUpdate`].

use crate::collaborators::{Generator, RelevanceGrader, Retriever, WebSearch};
use crate::state::{Document, RagState, StateUpdate};
use crate::step::{Step, StepError, StepResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const RETRIEVE: &str = "retrieve";
pub const GRADE_DOCUMENTS: &str = "grade_documents";
pub const GENERATE: &str = "generate";
pub const WEBSEARCH: &str = "websearch";

/// Source recorded on documents built from web search results.
pub const WEB_SEARCH_SOURCE: &str = "web_search";

pub struct Retrieve {
    retriever: Arc<dyn Retriever>,
}

impl Retrieve {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

impl Step<RagState> for Retrieve {
    fn name(&self) -> &'static str {
        RETRIEVE
    }

    fn run(&mut self, state: &RagState) -> StepResult<StateUpdate> {
        let documents = self.retriever.retrieve(state.question())?;
        info!(count = documents.len(), "retrieved documents");
        Ok(StateUpdate::default().replace_documents(documents))
    }
}

/// Keeps the documents the grader finds relevant. A single irrelevant
/// document, or nothing left after filtering, asks for web search.
pub struct GradeDocuments {
    grader: Arc<dyn RelevanceGrader>,
}

impl GradeDocuments {
    pub fn new(grader: Arc<dyn RelevanceGrader>) -> Self {
        Self { grader }
    }
}

impl Step<RagState> for GradeDocuments {
    fn name(&self) -> &'static str {
        GRADE_DOCUMENTS
    }

    fn run(&mut self, state: &RagState) -> StepResult<StateUpdate> {
        let mut relevant = Vec::with_capacity(state.documents.len());
        let mut any_irrelevant = false;

        for doc in &state.documents {
            if self.grader.is_relevant(state.question(), &doc.content)? {
                debug!("document relevant");
                relevant.push(doc.clone());
            } else {
                debug!("document not relevant");
                any_irrelevant = true;
            }
        }

        let needs_web_search = any_irrelevant || relevant.is_empty();
        info!(
            kept = relevant.len(),
            total = state.documents.len(),
            needs_web_search,
            "graded documents"
        );
        Ok(StateUpdate::default()
            .replace_documents(relevant)
            .needs_web_search(needs_web_search))
    }
}

pub struct Generate {
    generator: Arc<dyn Generator>,
}

impl Generate {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

impl Step<RagState> for Generate {
    fn name(&self) -> &'static str {
        GENERATE
    }

    fn run(&mut self, state: &RagState) -> StepResult<StateUpdate> {
        if state.documents.is_empty() {
            return Err(StepError::empty_retrieval(
                "no documents available to generate from",
            ));
        }
        let generation = self
            .generator
            .generate(state.question(), &state.documents)?;
        info!(attempt = state.generations + 1, chars = generation.len(), "generated answer");
        Ok(StateUpdate::default().generation(generation))
    }
}

/// Joins all hits into one document and appends it; earlier documents stay.
///
/// No hits means no document: an empty placeholder would reach Generate as
/// context with nothing in it. With nothing retrieved either, the run fails
/// with [`StepError::EmptyRetrieval`] instead.
pub struct WebSearchStep {
    search: Arc<dyn WebSearch>,
}

impl WebSearchStep {
    pub fn new(search: Arc<dyn WebSearch>) -> Self {
        Self { search }
    }
}

impl Step<RagState> for WebSearchStep {
    fn name(&self) -> &'static str {
        WEBSEARCH
    }

    fn run(&mut self, state: &RagState) -> StepResult<StateUpdate> {
        let hits = self.search.search(state.question())?;
        if hits.is_empty() {
            if state.documents.is_empty() {
                return Err(StepError::empty_retrieval(
                    "web search returned nothing and no documents were retrieved",
                ));
            }
            // deliberately appends nothing rather than an empty document
            warn!("web search returned no results; keeping existing documents");
            return Ok(StateUpdate::default().append_documents(Vec::new()));
        }

        let joined = hits
            .iter()
            .map(|h| h.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        info!(hits = hits.len(), "web search results added");
        Ok(StateUpdate::default()
            .append_documents(vec![Document::new(joined).with_source(WEB_SEARCH_SOURCE)]))
    }
}
