//! Routing functions for the answering graph. They read the merged state and
//! return a branch label; the graph maps labels to steps.

use crate::collaborators::{AnswerGrader, DataSource, HallucinationGrader, QuestionRouter};
use crate::state::RagState;
use crate::step::{Route, StepError};
use std::sync::Arc;
use tracing::info;

pub const TO_WEBSEARCH: &str = "websearch";
pub const TO_VECTORSTORE: &str = "vectorstore";
pub const TO_GENERATE: &str = "generate";

/// Generation is not grounded in the documents; generate again.
pub const HALLUCINATION: &str = "hallucination";
/// Grounded but does not answer the question; search the web and regenerate.
pub const RE_SEARCH: &str = "re-search";
/// Grounded and answers the question.
pub const USEFUL: &str = "useful";
/// A check failed and the generation budget is spent.
pub const GIVE_UP: &str = "give-up";

/// Entry router: corpus or web.
pub struct RouteQuestion {
    router: Arc<dyn QuestionRouter>,
}

impl RouteQuestion {
    pub fn new(router: Arc<dyn QuestionRouter>) -> Self {
        Self { router }
    }
}

impl Route<RagState> for RouteQuestion {
    fn route(&mut self, state: &RagState) -> Result<&'static str, StepError> {
        let label = match self.router.route_question(state.question())? {
            DataSource::Websearch => TO_WEBSEARCH,
            DataSource::Vectorstore => TO_VECTORSTORE,
        };
        info!(route = label, "routed question");
        Ok(label)
    }
}

pub fn decide_to_generate(state: &RagState) -> Result<&'static str, StepError> {
    if state.needs_web_search {
        info!("not all documents are relevant, adding web search");
        Ok(TO_WEBSEARCH)
    } else {
        info!("documents relevant, generating");
        Ok(TO_GENERATE)
    }
}

/// Two-stage check of the latest generation: grounding first, then whether
/// it answers the question. The answer check only runs on grounded output.
pub struct GradeGeneration {
    hallucination: Arc<dyn HallucinationGrader>,
    answer: Arc<dyn AnswerGrader>,
    max_generations: Option<u32>,
}

impl GradeGeneration {
    pub fn new(hallucination: Arc<dyn HallucinationGrader>, answer: Arc<dyn AnswerGrader>) -> Self {
        Self {
            hallucination,
            answer,
            max_generations: None,
        }
    }

    /// Stop looping once Generate has run this many times. `None` loops until
    /// the graders pass.
    pub fn with_max_generations(mut self, max: Option<u32>) -> Self {
        self.max_generations = max;
        self
    }

    fn retry_or_give_up(&self, state: &RagState, retry: &'static str) -> &'static str {
        match self.max_generations {
            Some(max) if state.generations >= max => {
                info!(
                    generations = state.generations,
                    "generation budget spent, returning best effort"
                );
                GIVE_UP
            }
            _ => retry,
        }
    }
}

impl Route<RagState> for GradeGeneration {
    fn route(&mut self, state: &RagState) -> Result<&'static str, StepError> {
        if !self
            .hallucination
            .is_grounded(&state.documents, &state.generation)?
        {
            info!("generation is not grounded in documents");
            return Ok(self.retry_or_give_up(state, HALLUCINATION));
        }

        if !self
            .answer
            .addresses_question(state.question(), &state.generation)?
        {
            info!("generation does not address question");
            return Ok(self.retry_or_give_up(state, RE_SEARCH));
        }

        info!("generation is grounded and addresses question");
        Ok(USEFUL)
    }
}
