use crate::state::GraphState;
use crate::step::{Route, Step, StepError, StepResult};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Target name for edges that finish the run.
pub const END: &str = "__end__";

// ---------------------------------------------------------------------------
// WorkflowError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("duplicate step name: {0}")]
    DuplicateStep(&'static str),
    #[error("unknown step: {0}")]
    UnknownStep(&'static str),
    #[error("workflow missing entry")]
    MissingEntry,
    #[error("step '{0}' has more than one set of outgoing edges")]
    DuplicateEdges(&'static str),
    #[error("step '{0}' has no outgoing edge")]
    DeadEnd(&'static str),
    #[error("conditional edges from '{0}' have no branches")]
    NoBranches(&'static str),
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Where to go after a step (or at entry).
pub(crate) enum Edge<S> {
    Direct(&'static str),
    Conditional {
        route: Box<dyn Route<S>>,
        branches: Vec<(&'static str, &'static str)>,
    },
}

impl<S: 'static> Edge<S> {
    fn targets(&self) -> Vec<&'static str> {
        match self {
            Edge::Direct(to) => vec![*to],
            Edge::Conditional { branches, .. } => branches.iter().map(|(_, to)| *to).collect(),
        }
    }

    /// Resolve this edge against the state: `(branch label, target)`.
    fn resolve(
        &mut self,
        from: &'static str,
        state: &S,
    ) -> Result<(Option<&'static str>, &'static str), StepError> {
        match self {
            Edge::Direct(to) => Ok((None, *to)),
            Edge::Conditional { route, branches } => {
                let label = route.route(state)?;
                branches
                    .iter()
                    .find(|(l, _)| *l == label)
                    .map(|(_, to)| (Some(label), *to))
                    .ok_or(StepError::UnknownBranch { node: from, label })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowBuilder
// ---------------------------------------------------------------------------

pub struct WorkflowBuilder<S: GraphState> {
    name: &'static str,
    order: Vec<&'static str>,
    steps: HashMap<&'static str, Box<dyn Step<S>>>,
    entry: Option<Edge<S>>,
    edges: HashMap<&'static str, Edge<S>>,
    duplicate: Option<WorkflowError>,
}

impl<S: GraphState> WorkflowBuilder<S> {
    pub fn register<T: Step<S>>(mut self, step: T) -> Self {
        let name = step.name();
        if self.steps.contains_key(name) {
            self.duplicate = self.duplicate.or(Some(WorkflowError::DuplicateStep(name)));
        } else {
            self.order.push(name);
        }
        self.steps.insert(name, Box::new(step));
        self
    }

    /// Enter the graph at a fixed step.
    pub fn start_at(mut self, step: &'static str) -> Self {
        self.entry = Some(Edge::Direct(step));
        self
    }

    /// Enter the graph at whichever step `route` picks.
    pub fn conditional_entry(
        mut self,
        route: impl Route<S>,
        branches: &[(&'static str, &'static str)],
    ) -> Self {
        self.entry = Some(Edge::Conditional {
            route: Box::new(route),
            branches: branches.to_vec(),
        });
        self
    }

    /// Always go from `from` to `to`. `to` may be [`END`].
    pub fn edge(self, from: &'static str, to: &'static str) -> Self {
        self.add_edge(from, Edge::Direct(to))
    }

    /// After `from`, evaluate `route` and follow the branch whose label it returns.
    pub fn conditional_edges(
        self,
        from: &'static str,
        route: impl Route<S>,
        branches: &[(&'static str, &'static str)],
    ) -> Self {
        self.add_edge(
            from,
            Edge::Conditional {
                route: Box::new(route),
                branches: branches.to_vec(),
            },
        )
    }

    fn add_edge(mut self, from: &'static str, edge: Edge<S>) -> Self {
        if self.edges.insert(from, edge).is_some() {
            self.duplicate = self.duplicate.or(Some(WorkflowError::DuplicateEdges(from)));
        }
        self
    }

    pub fn build(self) -> Result<Workflow<S>, WorkflowError> {
        if let Some(err) = self.duplicate {
            return Err(err);
        }

        let entry = self.entry.ok_or(WorkflowError::MissingEntry)?;
        let check = |from: &'static str, edge: &Edge<S>| -> Result<(), WorkflowError> {
            let targets = edge.targets();
            if targets.is_empty() {
                return Err(WorkflowError::NoBranches(from));
            }
            match targets.into_iter().find(|t| *t != END && !self.steps.contains_key(t)) {
                Some(missing) => Err(WorkflowError::UnknownStep(missing)),
                None => Ok(()),
            }
        };

        check("entry", &entry)?;
        for (&from, edge) in &self.edges {
            if !self.steps.contains_key(from) {
                return Err(WorkflowError::UnknownStep(from));
            }
            check(from, edge)?;
        }

        if let Some(&dead) = self.order.iter().find(|s| !self.edges.contains_key(*s)) {
            return Err(WorkflowError::DeadEnd(dead));
        }

        Ok(Workflow {
            name: self.name,
            order: self.order,
            steps: self.steps,
            entry,
            edges: self.edges,
        })
    }
}

// ---------------------------------------------------------------------------
// Workflow (validated, only constructed via build())
// ---------------------------------------------------------------------------

pub struct Workflow<S: GraphState> {
    name: &'static str,
    order: Vec<&'static str>,
    steps: HashMap<&'static str, Box<dyn Step<S>>>,
    entry: Edge<S>,
    edges: HashMap<&'static str, Edge<S>>,
}

impl<S: GraphState> Workflow<S> {
    pub fn builder(name: &'static str) -> WorkflowBuilder<S> {
        WorkflowBuilder {
            name,
            order: Vec::new(),
            steps: HashMap::new(),
            entry: None,
            edges: HashMap::new(),
            duplicate: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Render the graph as a Mermaid flowchart. Conditional edges are dotted
    /// and labelled with their branch.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD;\n");
        let _ = writeln!(out, "    __start__([__start__]);");
        for name in &self.order {
            let _ = writeln!(out, "    {name}({name});");
        }
        let _ = writeln!(out, "    {END}([{END}]);");

        let edges = std::iter::once(("__start__", &self.entry))
            .chain(self.order.iter().filter_map(|n| self.edges.get(n).map(|e| (*n, e))));
        for (from, edge) in edges {
            match edge {
                Edge::Direct(to) => {
                    let _ = writeln!(out, "    {from} --> {to};");
                }
                Edge::Conditional { branches, .. } => {
                    for (label, to) in branches {
                        let _ = writeln!(out, "    {from} -.->|{label}| {to};");
                    }
                }
            }
        }
        out
    }

    // --- used by the runner ---
    pub(crate) fn enter(
        &mut self,
        state: &S,
    ) -> Result<(Option<&'static str>, &'static str), StepError> {
        self.entry.resolve("entry", state)
    }

    pub(crate) fn run_step(&mut self, name: &'static str, state: &S) -> StepResult<S::Update> {
        let step = self.steps.get_mut(name).ok_or(StepError::UnknownStep(name))?;
        step.run(state)
    }

    pub(crate) fn next(
        &mut self,
        from: &'static str,
        state: &S,
    ) -> Result<(Option<&'static str>, &'static str), StepError> {
        let edge = self.edges.get_mut(from).ok_or(StepError::UnknownStep(from))?;
        edge.resolve(from, state)
    }
}
