//! The standard adaptive answering graph, wired from a set of collaborators.

use crate::collaborators::{
    AnswerGrader, Generator, HallucinationGrader, QuestionRouter, RelevanceGrader, Retriever,
    WebSearch,
};
use crate::nodes::{
    GENERATE, GRADE_DOCUMENTS, Generate, GradeDocuments, RETRIEVE, Retrieve, WEBSEARCH,
    WebSearchStep,
};
use crate::routes::{
    GIVE_UP, GradeGeneration, HALLUCINATION, RE_SEARCH, RouteQuestion, TO_GENERATE, TO_VECTORSTORE,
    TO_WEBSEARCH, USEFUL, decide_to_generate,
};
use crate::runner::{Event, Runner, StepEvent};
use crate::state::{Document, RagState};
use crate::step::StepError;
use crate::workflow::{END, Workflow, WorkflowError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const WORKFLOW_NAME: &str = "adaptive-rag";

/// Everything the graph calls out to.
#[derive(Clone)]
pub struct Collaborators {
    pub router: Arc<dyn QuestionRouter>,
    pub retriever: Arc<dyn Retriever>,
    pub relevance: Arc<dyn RelevanceGrader>,
    pub generator: Arc<dyn Generator>,
    pub hallucination: Arc<dyn HallucinationGrader>,
    pub answer: Arc<dyn AnswerGrader>,
    pub web_search: Arc<dyn WebSearch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Grounded in the documents and answers the question.
    Useful,
    /// The generation budget ran out before both checks passed.
    BestEffort,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub generation: String,
    pub documents: Vec<Document>,
    pub generations: u32,
    pub status: AnswerStatus,
}

/// Answers questions with the retrieve / grade / generate / self-check loop.
///
/// Collaborators are shared; every call builds its own graph and state, so
/// one `AdaptiveRag` can serve many threads.
pub struct AdaptiveRag {
    collaborators: Collaborators,
    max_generations: Option<u32>,
    max_steps: usize,
}

impl AdaptiveRag {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            max_generations: Some(3),
            max_steps: 25,
        }
    }

    /// `None` lets a failing check loop until the step limit.
    pub fn with_max_generations(mut self, max: Option<u32>) -> Self {
        self.max_generations = max;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Build a fresh instance of the graph.
    pub fn workflow(&self) -> Result<Workflow<RagState>, WorkflowError> {
        let c = &self.collaborators;
        Workflow::builder(WORKFLOW_NAME)
            .register(Retrieve::new(c.retriever.clone()))
            .register(GradeDocuments::new(c.relevance.clone()))
            .register(Generate::new(c.generator.clone()))
            .register(WebSearchStep::new(c.web_search.clone()))
            .conditional_entry(
                RouteQuestion::new(c.router.clone()),
                &[(TO_WEBSEARCH, WEBSEARCH), (TO_VECTORSTORE, RETRIEVE)],
            )
            .edge(RETRIEVE, GRADE_DOCUMENTS)
            .conditional_edges(
                GRADE_DOCUMENTS,
                decide_to_generate,
                &[(TO_WEBSEARCH, WEBSEARCH), (TO_GENERATE, GENERATE)],
            )
            .conditional_edges(
                GENERATE,
                GradeGeneration::new(c.hallucination.clone(), c.answer.clone())
                    .with_max_generations(self.max_generations),
                &[
                    (HALLUCINATION, GENERATE),
                    (RE_SEARCH, WEBSEARCH),
                    (USEFUL, END),
                    (GIVE_UP, END),
                ],
            )
            .edge(WEBSEARCH, GENERATE)
            .build()
    }

    pub fn answer(&self, question: &str) -> Result<Answer, StepError> {
        self.answer_with_progress(question, |_| {})
    }

    /// Answer `question`, calling `progress` once per completed step.
    pub fn answer_with_progress(
        &self,
        question: &str,
        mut progress: impl FnMut(&StepEvent),
    ) -> Result<Answer, StepError> {
        let workflow = self
            .workflow()
            .map_err(|e| StepError::invalid(format!("graph construction failed: {e}")))?;
        let mut runner = Runner::new(workflow)
            .with_max_steps(self.max_steps)
            .with_tracing();

        info!(question, "answering");
        for event in runner.stream(RagState::new(question)) {
            match event? {
                Event::Step(step) => progress(&step),
                Event::Finished(done) => {
                    let status = if done.branch == Some(USEFUL) {
                        AnswerStatus::Useful
                    } else {
                        warn!(generations = done.state.generations, "returning best-effort answer");
                        AnswerStatus::BestEffort
                    };
                    let state = done.state;
                    return Ok(Answer {
                        question: state.question().to_string(),
                        generation: state.generation,
                        documents: state.documents,
                        generations: state.generations,
                        status,
                    });
                }
            }
        }
        Err(StepError::invalid("run stopped before producing an answer"))
    }
}
