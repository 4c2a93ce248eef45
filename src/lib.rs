//! Adaptive retrieval-augmented answering.
//!
//! A question is routed to the indexed corpus or to web search, retrieved
//! documents are graded for relevance, an answer is generated, and the answer
//! is checked for grounding and usefulness before it is returned. Failed
//! checks loop back to generation or to web search.
//!
//! The control flow lives in a small generic engine: [`Step`]s propose
//! partial updates, the [`Runner`] merges them into the state, and [`Route`]s
//! on the [`Workflow`]'s edges pick where to go next.
//!
//! # Quick start
//!
//! ```rust
//! use adaptive_rag::{END, GraphState, Runner, Step, StepResult, Workflow};
//!
//! struct Count(u32);
//! impl GraphState for Count {
//!     type Update = u32;
//!     fn apply(&mut self, update: u32) { self.0 += update; }
//! }
//!
//! struct AddOne;
//! impl Step<Count> for AddOne {
//!     fn name(&self) -> &'static str { "add_one" }
//!     fn run(&mut self, _state: &Count) -> StepResult<u32> { Ok(1) }
//! }
//!
//! let wf = Workflow::builder("demo")
//!     .register(AddOne)
//!     .start_at("add_one")
//!     .edge("add_one", END)
//!     .build()
//!     .unwrap();
//!
//! let result = Runner::new(wf).run(Count(0)).unwrap();
//! assert_eq!(result.0, 1);
//! ```
//!
//! For the answering graph itself, fill a [`Collaborators`] and call
//! [`AdaptiveRag::answer`].

pub mod collaborators;
pub mod config;
pub mod nodes;
mod pipeline;
pub mod routes;
mod runner;
mod state;
mod step;
pub mod tools;
mod workflow;

pub use collaborators::{
    AnswerGrader, DataSource, Generator, HallucinationGrader, QuestionRouter, RelevanceGrader,
    Retriever, SearchHit, WebSearch,
};
pub use config::{Config, ConfigError};
pub use pipeline::{AdaptiveRag, Answer, AnswerStatus, Collaborators, WORKFLOW_NAME};
pub use runner::{ErrorEvent, Event, Finished, Runner, StepEvent, Stream};
pub use state::{Document, DocumentsUpdate, GraphState, RagState, StateUpdate};
pub use step::{Route, Step, StepError, StepResult};
pub use workflow::{END, Workflow, WorkflowBuilder, WorkflowError};
