use crate::state::GraphState;
use crate::step::StepError;
use crate::workflow::{END, Workflow};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Emitted after each successful step, once the update is merged and the
/// outgoing edge resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent {
    pub node: &'static str,
    pub step_number: usize,
    pub duration: Duration,
    /// Label returned by the router on the outgoing edge, if it was conditional.
    pub branch: Option<&'static str>,
    /// Where the run goes next; [`END`] when it is about to finish.
    pub next: &'static str,
}

/// Passed to the `on_error` hook when a step or router errors, or a limit is
/// exceeded.
pub struct ErrorEvent<'a> {
    pub node: &'a str,
    pub error: &'a StepError,
    pub step_number: usize,
}

/// A run that reached [`END`].
#[derive(Debug)]
pub struct Finished<S> {
    pub state: S,
    /// Branch label of the edge that led to [`END`].
    pub branch: Option<&'static str>,
    pub steps: usize,
}

/// Items yielded by [`Runner::stream`].
#[derive(Debug)]
pub enum Event<S> {
    Step(StepEvent),
    Finished(Finished<S>),
}

pub struct Runner<S: GraphState> {
    wf: Workflow<S>,
    max_steps: usize,
    on_step: Option<Box<dyn FnMut(&StepEvent)>>,
    on_error: Option<Box<dyn FnMut(&ErrorEvent)>>,
}

impl<S: GraphState> Runner<S> {
    pub fn new(wf: Workflow<S>) -> Self {
        Self {
            wf,
            max_steps: 25,
            on_step: None,
            on_error: None,
        }
    }

    /// Cap the number of steps per run. Cyclic graphs rely on this as the
    /// last line against a loop that never reaches [`END`].
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Register a callback that fires after each successful step.
    pub fn on_step(mut self, cb: impl FnMut(&StepEvent) + 'static) -> Self {
        self.on_step = Some(Box::new(cb));
        self
    }

    /// Register a callback that fires when a step errors or a limit is exceeded.
    pub fn on_error(mut self, cb: impl FnMut(&ErrorEvent) + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Set both hooks to log step transitions and errors through `tracing`.
    pub fn with_tracing(self) -> Self {
        let workflow = self.wf.name();
        self.on_step(move |e| {
            info!(
                workflow,
                step = e.step_number,
                node = e.node,
                branch = e.branch.unwrap_or("-"),
                next = e.next,
                elapsed_ms = e.duration.as_millis() as u64,
                "step finished"
            );
        })
        .on_error(move |e| {
            error!(workflow, step = e.step_number, node = e.node, error = %e.error, "step failed");
        })
    }

    /// Drive the run to [`END`] and return the final state.
    pub fn run(&mut self, state: S) -> Result<S, StepError> {
        self.finish(state).map(|done| done.state)
    }

    /// Like [`Runner::run`], keeping the branch that ended the run.
    pub fn finish(&mut self, state: S) -> Result<Finished<S>, StepError> {
        for event in self.stream(state) {
            if let Event::Finished(done) = event? {
                return Ok(done);
            }
        }
        Err(StepError::invalid(format!(
            "workflow {} stopped before reaching {END}",
            self.wf.name()
        )))
    }

    /// Step through the run one event at a time. The iterator yields one
    /// [`Event::Step`] per completed step, then a single [`Event::Finished`];
    /// after an error it yields nothing more.
    pub fn stream(&mut self, state: S) -> Stream<'_, S> {
        Stream {
            runner: self,
            state: Some(state),
            cursor: Cursor::Entry,
            step_number: 0,
        }
    }

    fn report(&mut self, node: &str, step_number: usize, error: StepError) -> StepError {
        if let Some(cb) = &mut self.on_error {
            cb(&ErrorEvent {
                node,
                error: &error,
                step_number,
            });
        }
        error
    }
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Entry,
    At(&'static str),
    Finish(Option<&'static str>),
}

/// Iterator returned by [`Runner::stream`].
pub struct Stream<'a, S: GraphState> {
    runner: &'a mut Runner<S>,
    state: Option<S>,
    cursor: Cursor,
    step_number: usize,
}

impl<S: GraphState> Stream<'_, S> {
    fn fail(&mut self, node: &str, error: StepError) -> Option<Result<Event<S>, StepError>> {
        self.state = None;
        Some(Err(self.runner.report(node, self.step_number, error)))
    }
}

impl<S: GraphState> Iterator for Stream<'_, S> {
    type Item = Result<Event<S>, StepError>;

    fn next(&mut self) -> Option<Self::Item> {
        // state is gone once the run finished or failed
        self.state.as_ref()?;
        let current = match self.cursor {
            Cursor::Finish(branch) => {
                let state = self.state.take()?;
                return Some(Ok(Event::Finished(Finished {
                    state,
                    branch,
                    steps: self.step_number,
                })));
            }
            Cursor::At(node) => node,
            Cursor::Entry => {
                let state = self.state.as_ref()?;
                match self.runner.wf.enter(state) {
                    Ok((branch, target)) => {
                        debug!(branch = branch.unwrap_or("-"), target, "entered workflow");
                        if target == END {
                            self.cursor = Cursor::Finish(branch);
                            return self.next();
                        }
                        target
                    }
                    Err(err) => return self.fail("entry", err),
                }
            }
        };

        if self.step_number >= self.runner.max_steps {
            let err = StepError::StepLimit {
                workflow: self.runner.wf.name(),
                max_steps: self.runner.max_steps,
            };
            return self.fail(current, err);
        }
        self.step_number += 1;

        let state = self.state.as_mut()?;
        let start = Instant::now();
        let update = match self.runner.wf.run_step(current, state) {
            Ok(update) => update,
            Err(err) => return self.fail(current, err),
        };
        let duration = start.elapsed();
        state.apply(update);

        let (branch, next) = match self.runner.wf.next(current, state) {
            Ok(resolved) => resolved,
            Err(err) => return self.fail(current, err),
        };

        let event = StepEvent {
            node: current,
            step_number: self.step_number,
            duration,
            branch,
            next,
        };
        if let Some(cb) = &mut self.runner.on_step {
            cb(&event);
        }

        self.cursor = if next == END {
            Cursor::Finish(branch)
        } else {
            Cursor::At(next)
        };
        Some(Ok(Event::Step(event)))
    }
}
