use crate::timers::TimerQueue;
use core_types::NodeKey;
use doctree::{DocTree, MarkupError, TreeEdit, TreeError, TreeMutation, parse_markup};
use grammar::{EventSet, Grammar};
use std::sync::Arc;
use std::time::Duration;
use validator::{
    Position, ValidationError, Validator, ValidatorConfig, ValidatorError, ValidatorNotification,
    WorkingStatus,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

/// One document and its validator.
pub struct ValidationSession<G: Grammar> {
    tree: DocTree,
    validator: Validator<G, TimerQueue>,
    timers: TimerQueue,
}

impl<G: Grammar> ValidationSession<G> {
    pub fn new(tree: DocTree, grammar: Arc<G>, config: ValidatorConfig) -> Self {
        let timers = TimerQueue::new();
        let validator = Validator::new(grammar, config, timers.clone());
        Self {
            tree,
            validator,
            timers,
        }
    }

    pub fn from_markup(markup: &str, grammar: Arc<G>, config: ValidatorConfig) -> Result<Self, SessionError> {
        Ok(Self::new(parse_markup(markup)?, grammar, config))
    }

    pub fn tree(&self) -> &DocTree {
        &self.tree
    }

    pub fn validator(&self) -> &Validator<G, TimerQueue> {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut Validator<G, TimerQueue> {
        &mut self.validator
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn start(&mut self) {
        self.validator.start(&self.tree);
    }

    pub fn stop(&mut self) {
        self.validator.stop();
    }

    pub fn restart_at(&mut self, node: NodeKey) -> Result<(), SessionError> {
        Ok(self.validator.restart_at(&self.tree, node)?)
    }

    /// Applies `edits` in order. The mutations of each edit reach the
    /// validator as soon as that edit is in place. On failure the edits
    /// before the failing one stay applied.
    pub fn apply_edits(&mut self, edits: impl IntoIterator<Item = TreeEdit>) -> Result<(), SessionError> {
        for edit in edits {
            let mut mutations: Vec<TreeMutation> = Vec::new();
            self.tree.apply(edit, &mut mutations)?;
            for mutation in &mutations {
                log::trace!(target: "runtime.session", "forward {mutation:?}");
                self.validator.on_mutation(&self.tree, mutation);
            }
        }
        Ok(())
    }

    /// Moves the clock forward by `by`, running every slice that falls due
    /// on the way, including slices scheduled by those slices. Returns the
    /// number of slices run.
    pub fn advance(&mut self, by: Duration) -> usize {
        let until = self.timers.now() + by;
        let mut slices = 0;
        while let Some(ticket) = self.timers.pop_due(until) {
            self.validator.resume(&self.tree, ticket);
            slices += 1;
        }
        self.timers.advance_to(until);
        if slices > 0 {
            log::debug!(
                target: "runtime.session",
                "ran {slices} slices up to {until:?}: {:?}",
                self.validator.working_state()
            );
        }
        slices
    }

    /// Runs slices, jumping the clock from deadline to deadline, until no
    /// timer is left. Returns the number of slices run.
    pub fn run_until_idle(&mut self) -> usize {
        let mut slices = 0;
        while let Some(at) = self.timers.next_deadline() {
            let Some(ticket) = self.timers.pop_due(at) else {
                break;
            };
            self.validator.resume(&self.tree, ticket);
            slices += 1;
        }
        log::debug!(
            target: "runtime.session",
            "idle after {slices} slices at {:?}: {:?}",
            self.timers.now(),
            self.validator.working_state()
        );
        slices
    }

    pub fn possible_at(&mut self, position: Position) -> Result<EventSet, SessionError> {
        Ok(self.validator.possible_at(&self.tree, position)?)
    }

    pub fn possible_attributes_at(&mut self, element: NodeKey) -> Result<EventSet, SessionError> {
        Ok(self.validator.possible_attributes_at(&self.tree, element)?)
    }

    pub fn errors(&self) -> &[ValidationError] {
        self.validator.errors()
    }

    pub fn working_state(&self) -> WorkingStatus {
        self.validator.working_state()
    }

    pub fn take_notifications(&mut self) -> Vec<ValidatorNotification> {
        self.validator.take_notifications()
    }
}
