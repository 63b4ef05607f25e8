use crate::checkpoint::{Checkpoint, CheckpointKind};
use crate::config::ValidatorConfig;
use crate::document::DocumentValidator;
use crate::error::{ValidationError, ValidatorError};
use crate::notify::{ValidatorNotification, WorkingState, WorkingStatus};
use crate::projector::{Pass, Step};
use crate::scheduler::{ResumeTicket, TaskScheduler};
use core_types::NodeKey;
use doctree::{Attribute, AttributeClass, DocTree, NodeClass, TreeMutation};
use grammar::{Event, Grammar};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Highest fraction reported while a pass is still running.
const WORKING_CEILING: f64 = 0.999;
const ABORT_OUTLINE_LINES: usize = 40;

/// Incremental validator for one document.
///
/// All work happens on the caller's thread: [`Validator::start`] asks the
/// scheduler for a slice, the host hands the ticket back through
/// [`Validator::resume`], and each slice runs projector cycles until its
/// budget is used up. Tree edits must be reported through
/// [`Validator::on_mutation`] before the next slice or query.
pub struct Validator<G: Grammar, S: TaskScheduler> {
    pub(crate) grammar: Arc<G>,
    config: ValidatorConfig,
    scheduler: S,
    document_validators: Vec<Box<dyn DocumentValidator>>,
    pub(crate) pass: Option<Pass<G::Walker>>,
    state: WorkingState,
    /// Set by `stop`; the next `start` begins a fresh pass.
    stopped: bool,
    epoch: u64,
    slice: u64,
    pending: Option<ResumeTicket>,
    /// Errors already sent as notifications.
    reported: usize,
    notifications: Vec<ValidatorNotification>,
}

impl<G: Grammar, S: TaskScheduler> Validator<G, S> {
    pub fn new(grammar: Arc<G>, config: ValidatorConfig, scheduler: S) -> Self {
        Self {
            grammar,
            config,
            scheduler,
            document_validators: Vec::new(),
            pass: None,
            state: WorkingState::Incomplete,
            stopped: false,
            epoch: 0,
            slice: 0,
            pending: None,
            reported: 0,
            notifications: Vec::new(),
        }
    }

    pub fn add_document_validator(&mut self, validator: impl DocumentValidator + 'static) {
        self.document_validators.push(Box::new(validator));
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn grammar(&self) -> &Arc<G> {
        &self.grammar
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn working_state(&self) -> WorkingStatus {
        let fraction = match self.state {
            state if state.is_finished() => 1.0,
            _ => self
                .pass
                .as_ref()
                .map_or(0.0, |pass| pass.part_done.clamp(0.0, WORKING_CEILING)),
        };
        WorkingStatus {
            state: self.state,
            fraction,
        }
    }

    /// Errors of the current pass, in discovery order.
    pub fn errors(&self) -> &[ValidationError] {
        match &self.pass {
            Some(pass) => &pass.errors,
            None => &[],
        }
    }

    /// Errors of the current pass attached to `node` itself.
    pub fn errors_for(&self, node: NodeKey) -> Vec<&ValidationError> {
        self.errors().iter().filter(|error| error.node == node).collect()
    }

    /// Events fired by the current pass.
    pub fn event_log(&self) -> &[Event] {
        match &self.pass {
            Some(pass) => pass.log.events(),
            None => &[],
        }
    }

    pub fn checkpoint(&self, node: NodeKey, kind: CheckpointKind) -> Option<Checkpoint> {
        self.pass.as_ref()?.checkpoints.get(node, kind)
    }

    /// All checkpoints of the current pass in recording order.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.pass
            .as_ref()
            .map(|pass| pass.checkpoints.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn take_notifications(&mut self) -> Vec<ValidatorNotification> {
        std::mem::take(&mut self.notifications)
    }

    /// Namespaces known to the grammar.
    pub fn schema_namespaces(&self) -> BTreeSet<String> {
        self.grammar.namespaces()
    }

    /// Namespaces declared in the document, by prefix.
    pub fn document_namespaces(&self, tree: &DocTree) -> BTreeMap<String, Vec<String>> {
        doctree::document_namespaces(tree)
    }

    /// Starts background validation. Continues the current pass, including
    /// one that queries carried forward while idle, unless it was stopped or
    /// has already reported its outcome; then a new pass begins.
    pub fn start(&mut self, tree: &DocTree) {
        let fresh = match &self.pass {
            None => true,
            Some(pass) => self.stopped || (pass.is_finished() && self.state.is_finished()),
        };
        if fresh {
            self.reset(tree);
        }
        log::debug!(target: "validator.scheduler", "start (fresh pass: {fresh})");
        self.begin_working();
    }

    /// Cancels the next slice. Walker state is left as is and discarded by
    /// the next `start` or `restart_at`.
    pub fn stop(&mut self) {
        self.cancel_pending();
        self.epoch += 1;
        self.stopped = true;
        log::debug!(target: "validator.scheduler", "stop");
        if self.state != WorkingState::Incomplete {
            self.state = WorkingState::Incomplete;
            self.emit_state();
        }
    }

    /// Discards everything recorded from just before `node` on and starts
    /// working again. The root restarts the whole document.
    pub fn restart_at(&mut self, tree: &DocTree, node: NodeKey) -> Result<(), ValidatorError> {
        if !tree.contains(node) {
            return Err(ValidatorError::UnknownNode { node });
        }
        self.cancel_pending();
        let partial = self.pass.is_some()
            && !self.stopped
            && node != tree.root()
            && self.config.partial_restart;
        match tree.parent(node) {
            Some(parent) if partial => {
                self.invalidate(tree, parent, node, tree.previous_sibling(node));
            }
            _ => self.reset(tree),
        }
        self.begin_working();
        Ok(())
    }

    /// Runs one slice if `ticket` is the one most recently issued.
    pub fn resume(&mut self, tree: &DocTree, ticket: ResumeTicket) {
        if self.pending != Some(ticket) {
            log::trace!(target: "validator.scheduler", "ignoring stale ticket {ticket:?}");
            return;
        }
        self.pending = None;
        if self.state != WorkingState::Working {
            return;
        }
        let started = Instant::now();
        let mut cycles = 0usize;
        loop {
            if !self.config.max_timespan.is_zero() && started.elapsed() >= self.config.max_timespan {
                break;
            }
            if self
                .config
                .max_cycles_per_slice
                .is_some_and(|max| cycles >= max)
            {
                break;
            }
            match self.step(tree) {
                Ok(Step::Continue) => cycles += 1,
                Ok(Step::Done) | Err(_) => return,
            }
        }
        log::trace!(target: "validator.scheduler", "slice ran {cycles} cycles");
        self.emit_state();
        self.schedule(self.config.timeout);
    }

    /// Drops recorded state that `mutation` makes stale and, if the
    /// validator was running or finished, resumes work.
    ///
    /// Edits in regions the pass has not reached yet, or in subtrees it
    /// never walks, need no restart.
    pub fn on_mutation(&mut self, tree: &DocTree, mutation: &TreeMutation) {
        let restarted = match mutation {
            TreeMutation::NodeInserted { node, parent }
            | TreeMutation::TextChanged { node, parent } => {
                self.invalidate(tree, *parent, *node, tree.previous_sibling(*node))
            }
            // Hosts that forward notifications once the edit is done see the
            // node detached already; `NodeRemoved` covers that case.
            TreeMutation::NodeWillBeRemoved { node, parent } => {
                tree.parent(*node) == Some(*parent)
                    && self.invalidate(tree, *parent, *node, tree.previous_sibling(*node))
            }
            TreeMutation::NodeRemoved {
                node,
                parent,
                previous_sibling,
                next_sibling,
            } => {
                let reached = self.pass.as_ref().is_some_and(|pass| {
                    !pass.frames_attached(tree)
                        || pass.has_reached_gap(tree, *parent, *node, *next_sibling)
                });
                self.redo_after(tree, reached, *parent, *previous_sibling)
            }
            TreeMutation::AttributeChanged { node, name } => {
                let bookkeeping = Attribute::new(name, "").class() == AttributeClass::Bookkeeping;
                match tree.parent(*node) {
                    Some(parent)
                        if !bookkeeping && tree.class(*node) == Some(NodeClass::Element) =>
                    {
                        self.invalidate(tree, parent, *node, tree.previous_sibling(*node))
                    }
                    _ => false,
                }
            }
        };
        if restarted && self.state != WorkingState::Incomplete {
            self.begin_working();
        }
    }

    /// Runs one projector cycle and publishes its outcome.
    pub(crate) fn step(&mut self, tree: &DocTree) -> Result<Step, ValidatorError> {
        let Some(pass) = self.pass.as_mut() else {
            return Ok(Step::Done);
        };
        if pass.is_finished() {
            if self.state == WorkingState::Working {
                self.flush_errors();
                self.finish();
            }
            return Ok(Step::Done);
        }
        let step = match pass.cycle(tree, &self.document_validators) {
            Ok(step) => step,
            Err(err) => {
                self.abort(tree, err.clone());
                return Err(err);
            }
        };
        // Cycles forced by a query on an idle validator build checkpoints
        // but leave the state and notifications to the next `start`.
        if self.state == WorkingState::Working {
            self.flush_errors();
            if step == Step::Done {
                self.finish();
            }
        }
        Ok(step)
    }

    /// Starts a new pass from the top of the document.
    pub(crate) fn reset(&mut self, tree: &DocTree) {
        let had_pass = self.pass.is_some();
        self.pass = Some(Pass::new(self.grammar.new_walker(), tree.root()));
        self.reported = 0;
        self.stopped = false;
        if had_pass {
            self.notifications
                .push(ValidatorNotification::ResetErrors { at: 0 });
        }
    }

    fn invalidate(
        &mut self,
        tree: &DocTree,
        parent: NodeKey,
        node: NodeKey,
        previous: Option<NodeKey>,
    ) -> bool {
        let reached = self
            .pass
            .as_ref()
            .is_some_and(|pass| pass.has_reached(tree, parent, node));
        self.redo_after(tree, reached, parent, previous)
    }

    /// Throws away what was recorded after the gap following `previous`
    /// under `parent`, if the pass has `reached` it.
    fn redo_after(
        &mut self,
        tree: &DocTree,
        reached: bool,
        parent: NodeKey,
        previous: Option<NodeKey>,
    ) -> bool {
        if !reached {
            log::trace!(target: "validator.scheduler", "edit under {parent} is ahead of the pass");
            return false;
        }
        if !self.config.partial_restart {
            self.reset(tree);
            return true;
        }
        self.rewind_to_gap(tree, parent, previous)
    }

    fn rewind_to_gap(&mut self, tree: &DocTree, parent: NodeKey, previous: Option<NodeKey>) -> bool {
        let fresh = self.grammar.new_walker();
        let Some(pass) = self.pass.as_mut() else {
            return false;
        };
        let Some((record, base)) = pass.base_before(tree, parent, previous) else {
            log::trace!(target: "validator.scheduler", "no checkpoint under {parent}; nothing to redo");
            return false;
        };
        match pass.rewind(tree, record, base, fresh) {
            Ok(kept) => {
                self.reported = self.reported.min(kept);
                self.notifications
                    .push(ValidatorNotification::ResetErrors { at: kept });
            }
            Err(err) => {
                log::warn!(target: "validator.scheduler", "partial restart failed: {err}");
                self.notifications
                    .push(ValidatorNotification::InternalError(err));
                self.reset(tree);
            }
        }
        true
    }

    fn begin_working(&mut self) {
        self.cancel_pending();
        self.epoch += 1;
        self.stopped = false;
        self.state = WorkingState::Working;
        self.emit_state();
        self.schedule(Duration::ZERO);
    }

    fn finish(&mut self) {
        self.cancel_pending();
        let errors = self.errors().len();
        self.state = if errors == 0 {
            WorkingState::Valid
        } else {
            WorkingState::Invalid
        };
        log::debug!(target: "validator.scheduler", "pass finished: {:?}, {errors} errors", self.state);
        self.emit_state();
    }

    fn abort(&mut self, tree: &DocTree, err: ValidatorError) {
        log::warn!(target: "validator.scheduler", "pass aborted: {err}");
        if log::log_enabled!(target: "validator.scheduler", log::Level::Debug) {
            let lines = doctree::outline::outline(tree, tree.root(), ABORT_OUTLINE_LINES);
            log::debug!(target: "validator.scheduler", "document at abort:\n{}", lines.join("\n"));
        }
        self.cancel_pending();
        self.stopped = true;
        self.state = WorkingState::Incomplete;
        self.notifications
            .push(ValidatorNotification::InternalError(err));
        self.emit_state();
    }

    fn flush_errors(&mut self) {
        let Some(pass) = self.pass.as_ref() else {
            return;
        };
        for error in pass.errors.iter().skip(self.reported) {
            self.notifications
                .push(ValidatorNotification::Error(error.clone()));
        }
        self.reported = pass.errors.len();
    }

    fn emit_state(&mut self) {
        let status = self.working_state();
        self.notifications
            .push(ValidatorNotification::StateUpdate(status));
    }

    fn schedule(&mut self, delay: Duration) {
        self.slice += 1;
        let ticket = ResumeTicket {
            epoch: self.epoch,
            slice: self.slice,
        };
        self.pending = Some(ticket);
        self.scheduler.schedule(delay, ticket);
    }

    fn cancel_pending(&mut self) {
        if let Some(ticket) = self.pending.take() {
            self.scheduler.cancel(ticket);
        }
    }
}
