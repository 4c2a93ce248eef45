use crate::state::GraphState;

/// The result of running a step: a partial update for the runner to merge.
pub type StepResult<U> = Result<U, StepError>;

/// A sync step that reads the state and proposes a partial update.
///
/// Implement this trait on your own structs and register them into a
/// [`crate::Workflow`]. Where execution goes next is decided by the
/// workflow's edges, not by the step.
pub trait Step<S: GraphState>: Send + 'static {
    /// A unique name for this step, used as the node id in the graph.
    fn name(&self) -> &'static str;

    /// Run one visit of this step against the current state.
    fn run(&mut self, state: &S) -> StepResult<S::Update>;
}

/// A routing function evaluated against the merged state to pick a branch
/// label. Labels are mapped to targets by the workflow.
pub trait Route<S>: Send + 'static {
    fn route(&mut self, state: &S) -> Result<&'static str, StepError>;
}

impl<S, F> Route<S> for F
where
    F: FnMut(&S) -> Result<&'static str, StepError> + Send + 'static,
{
    fn route(&mut self, state: &S) -> Result<&'static str, StepError> {
        self(state)
    }
}

/// Error type for steps, routers, and collaborators, with variants designed
/// around what the caller can do about them.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A collaborator could not be reached or refused the call.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// A collaborator did not answer in time.
    #[error("timeout: {0}")]
    Timeout(String),
    /// No documents to generate from.
    #[error("empty retrieval: {0}")]
    EmptyRetrieval(String),
    /// A collaborator answered with something we could not understand.
    #[error("invalid: {0}")]
    Invalid(String),
    /// The run took more steps than the runner allows.
    #[error("max_steps ({max_steps}) exceeded in workflow {workflow}")]
    StepLimit {
        workflow: &'static str,
        max_steps: usize,
    },
    /// A router returned a label its edge table does not know.
    #[error("router after '{node}' returned unknown branch '{label}'")]
    UnknownBranch {
        node: &'static str,
        label: &'static str,
    },
    #[error("unknown step: {0}")]
    UnknownStep(&'static str),
}

impl From<ureq::Error> for StepError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Timeout(_) => StepError::Timeout(e.to_string()),
            ureq::Error::Json(_) => StepError::Invalid(e.to_string()),
            other => StepError::Unavailable(other.to_string()),
        }
    }
}

impl From<std::io::Error> for StepError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            StepError::Timeout(e.to_string())
        } else {
            StepError::Unavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StepError {
    fn from(e: serde_json::Error) -> Self {
        StepError::Invalid(e.to_string())
    }
}

impl StepError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        StepError::Unavailable(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        StepError::Invalid(msg.into())
    }

    pub fn empty_retrieval(msg: impl Into<String>) -> Self {
        StepError::EmptyRetrieval(msg.into())
    }

    /// Whether running the question again might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StepError::Unavailable(_) | StepError::Timeout(_))
    }
}
