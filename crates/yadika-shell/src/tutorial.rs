//! Tutorial state machine.
//!
//! A tutorial is a fixed sequence of steps; the state is the current step
//! index. After every submitted line each pending step's predicate is
//! checked against the submitted text and the current VFS snapshot; on
//! success the machine advances one step, otherwise nothing happens and
//! the learner retries. Delays and animations are presentation concerns
//! the embedding UI adds on top.

use yadika_vfs::Vfs;

use crate::interpreter::EngineEvent;

type Predicate = Box<dyn Fn(&str, &Vfs) -> bool>;

/// One step of a tutorial: instruction text plus a completion predicate.
///
/// Auxiliary lesson state (simulated users, counters) lives inside the
/// predicate closure.
pub struct TutorialStep {
    description: String,
    predicate: Predicate,
}

impl TutorialStep {
    pub fn new(description: impl Into<String>, predicate: impl Fn(&str, &Vfs) -> bool + 'static) -> Self {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Predicate-gated step progression for one lesson instance.
///
/// The last step is the terminal "done" state; its predicate never runs.
pub struct TutorialMachine {
    steps: Vec<TutorialStep>,
    current: usize,
}

impl TutorialMachine {
    pub fn new(steps: Vec<TutorialStep>) -> Self {
        Self { steps, current: 0 }
    }

    pub fn step_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Option<&TutorialStep> {
        self.steps.get(self.current)
    }

    pub fn is_complete(&self) -> bool {
        self.current + 1 >= self.steps.len()
    }

    /// Check the pending step against a submitted line.
    ///
    /// Advances at most one step per submission; completing the
    /// next-to-last step also emits [`EngineEvent::TutorialComplete`].
    pub fn tick(&mut self, line: &str, vfs: &Vfs) -> Vec<EngineEvent> {
        if self.is_complete() {
            return Vec::new();
        }
        let step = &self.steps[self.current];
        if !(step.predicate)(line, vfs) {
            return Vec::new();
        }
        log::debug!("tutorial step {} completed", self.current);
        let mut events = vec![EngineEvent::StepCompleted { step: self.current }];
        self.current += 1;
        if self.is_complete() {
            events.push(EngineEvent::TutorialComplete);
        }
        events
    }
}
