//! Turns the document tree into grammar events, one stage change per cycle.
//!
//! The walk is depth-first with start tags in pre-order and end tags in
//! post-order. It is driven by an explicit frame stack so it can stop after
//! any cycle and pick up again later:
//!
//! - `StartTag`: namespace declarations are applied, then `enterStartTag`,
//!   one `attributeName`/`attributeValue` pair per data attribute and
//!   `leaveStartTag` are fired. Wrappers fire nothing. An after-start
//!   checkpoint is taken either way.
//! - `Contents`: children are visited from the frame cursor on. Text fires
//!   a `text` event when it has non-whitespace content or the walker
//!   currently accepts text. Elements and wrappers get a frame of their own;
//!   placeholders and decorations are skipped.
//! - `EndTag`: the root runs the end-of-input check and finishes the pass.
//!   Other elements fire `endTag`, take an after-end checkpoint and credit
//!   their portion to the parent.

use crate::checkpoint::{Checkpoint, CheckpointKind, CheckpointStore, EventLog};
use crate::document::DocumentValidator;
use crate::error::{ValidationError, ValidatorError, Violation};
use core_types::{Name, NodeKey};
use doctree::{DocTree, NameResolver, NodeClass, NodeKind, UnboundPrefix};
use grammar::{Event, FireResult, GrammarError, GrammarWalker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    StartTag,
    Contents,
    EndTag,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ProgressFrame {
    /// Fraction of the document done, as seen from inside this node.
    pub(crate) done: f64,
    /// Share of the document covered by this node.
    pub(crate) portion: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub(crate) node: NodeKey,
    pub(crate) class: NodeClass,
    pub(crate) stage: Stage,
    /// Last child handled in `Contents`.
    pub(crate) cursor: Option<NodeKey>,
    /// Walked children, counted when the contents are first entered.
    walkable: Option<usize>,
    /// Resolved name, for elements that fire tag events.
    name: Option<Name>,
    pub(crate) progress: ProgressFrame,
}

impl Frame {
    fn new(node: NodeKey, class: NodeClass, stage: Stage, progress: ProgressFrame) -> Self {
        Self {
            node,
            class,
            stage,
            cursor: None,
            walkable: None,
            name: None,
            progress,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Continue,
    /// The frame stack is empty. For a document pass the root's end was
    /// processed.
    Done,
}

/// Fires a text event if the text matters: non-whitespace content, or a
/// walker that currently accepts text. `None` means nothing was fired.
pub(crate) fn fire_text_if_needed<W: GrammarWalker>(walker: &mut W, text: &str) -> Option<(Event, FireResult)> {
    if text.trim().is_empty() && !walker.possible().accepts_text() {
        return None;
    }
    let event = Event::Text(text.to_string());
    let result = walker.fire_event(&event);
    Some((event, result))
}

fn walkable_children(tree: &DocTree, node: NodeKey) -> usize {
    tree.children(node)
        .iter()
        .filter(|child| tree.class(**child).is_some_and(NodeClass::is_walked))
        .count()
}

/// Name used when a prefix cannot be resolved: the local part, no namespace.
pub(crate) fn unresolved_fallback(qname: &str) -> Name {
    Name::local(qname.rsplit_once(':').map_or(qname, |(_, local)| local))
}

/// State of one validation pass.
pub(crate) struct Pass<W> {
    pub(crate) walker: W,
    pub(crate) log: EventLog,
    pub(crate) checkpoints: CheckpointStore,
    pub(crate) errors: Vec<ValidationError>,
    pub(crate) frames: Vec<Frame>,
    resolver: NameResolver,
    pub(crate) part_done: f64,
}

impl<W: GrammarWalker> Pass<W> {
    /// A document pass positioned inside the root, before its first child.
    pub(crate) fn new(walker: W, root: NodeKey) -> Self {
        let progress = ProgressFrame {
            done: 0.0,
            portion: 1.0,
        };
        let mut pass = Self::detached(walker, NameResolver::new());
        pass.frames
            .push(Frame::new(root, NodeClass::Root, Stage::Contents, progress));
        pass.checkpoints.record(Checkpoint {
            node: root,
            kind: CheckpointKind::AfterStart,
            event_index: 0,
            error_count: 0,
            done: 0.0,
            portion: 1.0,
        });
        pass
    }

    /// A pass with no frames, used to project standalone subtrees.
    pub(crate) fn detached(walker: W, resolver: NameResolver) -> Self {
        Self {
            walker,
            log: EventLog::default(),
            checkpoints: CheckpointStore::default(),
            errors: Vec::new(),
            frames: Vec::new(),
            resolver,
            part_done: 0.0,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Runs until the next stage change.
    pub(crate) fn cycle(
        &mut self,
        tree: &DocTree,
        document_validators: &[Box<dyn DocumentValidator>],
    ) -> Result<Step, ValidatorError> {
        let Some(frame) = self.frames.last() else {
            return Ok(Step::Done);
        };
        let node = frame.node;
        if !tree.contains(node) {
            return Err(ValidatorError::DetachedCursor { node });
        }
        match frame.stage {
            Stage::StartTag => {
                self.start_tag(tree, node)?;
                Ok(Step::Continue)
            }
            Stage::Contents => {
                self.contents(tree, node)?;
                Ok(Step::Continue)
            }
            Stage::EndTag => self.end_tag(tree, node, document_validators),
        }
    }

    /// Projects the subtree at `node` on its own, without end-of-input check.
    pub(crate) fn project_subtree(&mut self, tree: &DocTree, node: NodeKey) -> Result<(), ValidatorError> {
        let class = tree
            .class(node)
            .ok_or(ValidatorError::UnknownNode { node })?;
        match class {
            NodeClass::Text => {
                let text = tree.text(node).unwrap_or_default();
                self.fire_text(text, node);
            }
            NodeClass::Element | NodeClass::Wrapper => {
                let progress = ProgressFrame {
                    done: self.part_done,
                    portion: 1.0,
                };
                self.frames
                    .push(Frame::new(node, class, Stage::StartTag, progress));
                while self.cycle(tree, &[])? == Step::Continue {}
            }
            NodeClass::Placeholder | NodeClass::Decoration => {}
            NodeClass::Root => return Err(ValidatorError::NotAContainer { node }),
        }
        Ok(())
    }

    fn fire(&mut self, event: Event, node: NodeKey, offset: usize) {
        let result = self.walker.fire_event(&event);
        log::trace!(target: "validator.projector", "fire {event} for {node}");
        let event_index = self.log.push(event.clone());
        if let Err(errors) = result {
            self.record_grammar_errors(errors, Some(event), node, offset, event_index);
        }
    }

    fn fire_text(&mut self, text: &str, node: NodeKey) {
        if let Some((event, result)) = fire_text_if_needed(&mut self.walker, text) {
            log::trace!(target: "validator.projector", "fire {event} for {node}");
            let event_index = self.log.push(event.clone());
            if let Err(errors) = result {
                self.record_grammar_errors(errors, Some(event), node, 0, event_index);
            }
        }
    }

    fn record_grammar_errors(
        &mut self,
        errors: Vec<GrammarError>,
        event: Option<Event>,
        node: NodeKey,
        offset: usize,
        event_index: usize,
    ) {
        for error in errors {
            log::debug!(target: "validator.projector", "{node}: {error}");
            self.errors.push(ValidationError {
                violation: Violation::Grammar(error),
                event: event.clone(),
                node,
                offset,
                event_index,
            });
        }
    }

    fn resolved(&mut self, result: Result<Name, UnboundPrefix>, qname: &str, node: NodeKey) -> Name {
        result.unwrap_or_else(|unbound| {
            self.errors.push(ValidationError {
                violation: Violation::UnresolvedPrefix {
                    prefix: unbound.prefix,
                    name: qname.to_string(),
                },
                event: None,
                node,
                offset: 0,
                event_index: self.log.len(),
            });
            unresolved_fallback(qname)
        })
    }

    fn checkpoint(&mut self, node: NodeKey, kind: CheckpointKind, portion: f64) {
        self.checkpoints.record(Checkpoint {
            node,
            kind,
            event_index: self.log.len(),
            error_count: self.errors.len(),
            done: self.part_done,
            portion,
        });
    }

    fn start_tag(&mut self, tree: &DocTree, node: NodeKey) -> Result<(), ValidatorError> {
        let frame_index = self.frames.len() - 1;
        let class = self.frames[frame_index].class;
        if class.emits_tags() {
            let Some(NodeKind::Element(data)) = tree.kind(node) else {
                return Err(ValidatorError::DetachedCursor { node });
            };
            self.resolver.enter_context();
            self.resolver.apply_declarations(&data.attributes);
            let name = self.resolved(self.resolver.resolve_element(&data.name), &data.name, node);
            self.fire(Event::EnterStartTag(name.clone()), node, 0);
            for attr in data.data_attributes() {
                let attr_name =
                    self.resolved(self.resolver.resolve_attribute(&attr.name), &attr.name, node);
                self.fire(Event::AttributeName(attr_name), node, 0);
                self.fire(Event::AttributeValue(attr.value.clone()), node, 0);
            }
            self.fire(Event::LeaveStartTag, node, 0);
            self.frames[frame_index].name = Some(name);
        }
        let portion = self.frames[frame_index].progress.portion;
        self.checkpoint(node, CheckpointKind::AfterStart, portion);
        self.frames[frame_index].stage = Stage::Contents;
        Ok(())
    }

    fn contents(&mut self, tree: &DocTree, node: NodeKey) -> Result<(), ValidatorError> {
        let frame_index = self.frames.len() - 1;
        let frame = &mut self.frames[frame_index];
        let walkable = *frame
            .walkable
            .get_or_insert_with(|| walkable_children(tree, node));
        let mut next = match frame.cursor {
            None => tree.first_child(node),
            Some(cursor) => {
                if tree.parent(cursor) != Some(node) {
                    return Err(ValidatorError::DetachedCursor { node: cursor });
                }
                tree.next_sibling(cursor)
            }
        };
        while let Some(child) = next {
            self.frames[frame_index].cursor = Some(child);
            match tree.class(child) {
                Some(NodeClass::Text) => {
                    let text = tree.text(child).unwrap_or_default();
                    self.fire_text(text, child);
                }
                Some(class @ (NodeClass::Element | NodeClass::Wrapper)) => {
                    let parent = &self.frames[frame_index].progress;
                    let progress = ProgressFrame {
                        done: self.part_done,
                        portion: parent.portion / walkable.max(1) as f64,
                    };
                    self.frames
                        .push(Frame::new(child, class, Stage::StartTag, progress));
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(ValidatorError::DetachedCursor { node: child }),
            }
            next = tree.next_sibling(child);
        }
        self.frames[frame_index].stage = Stage::EndTag;
        Ok(())
    }

    fn end_tag(
        &mut self,
        tree: &DocTree,
        node: NodeKey,
        document_validators: &[Box<dyn DocumentValidator>],
    ) -> Result<Step, ValidatorError> {
        let child_count = tree.children(node).len();
        let Some(frame) = self.frames.pop() else {
            return Ok(Step::Done);
        };

        if frame.class == NodeClass::Root {
            if let Err(errors) = self.walker.end() {
                let event_index = self.log.len();
                self.record_grammar_errors(errors, None, node, child_count, event_index);
            }
            for validator in document_validators {
                for issue in validator.validate(tree) {
                    self.errors.push(ValidationError {
                        violation: Violation::Document(issue.message),
                        event: None,
                        node: issue.node,
                        offset: 0,
                        event_index: self.log.len(),
                    });
                }
            }
            self.part_done = 1.0;
            self.checkpoint(node, CheckpointKind::AfterEnd, frame.progress.portion);
            return Ok(Step::Done);
        }

        if self.checkpoints.after_start(node).is_none() {
            return Err(ValidatorError::MissingStartCheckpoint { node });
        }
        if let Some(name) = frame.name {
            self.fire(Event::EndTag(name), node, child_count);
            self.resolver.leave_context();
        }
        if let Some(parent) = self.frames.last_mut()
            && parent.class != NodeClass::Root
        {
            parent.progress.done += frame.progress.portion;
            self.part_done = parent.progress.done.min(1.0);
        }
        self.checkpoint(node, CheckpointKind::AfterEnd, frame.progress.portion);
        Ok(if self.frames.is_empty() {
            Step::Done
        } else {
            Step::Continue
        })
    }

    /// Whether the walk has already gone past the start of `node`, a child of
    /// `parent`, so that an edit there invalidates recorded state.
    pub(crate) fn has_reached(&self, tree: &DocTree, parent: NodeKey, node: NodeKey) -> bool {
        if self.is_finished() {
            return true;
        }
        match self.frames.iter().find(|frame| frame.node == parent) {
            Some(frame) => match (frame.stage, frame.cursor) {
                (Stage::EndTag, _) => true,
                (_, None) => false,
                (_, Some(cursor)) if cursor == node => true,
                (_, Some(cursor)) => match (tree.index_in_parent(node), tree.index_in_parent(cursor)) {
                    (Some(at), Some(cursor_at)) => at < cursor_at,
                    _ => true,
                },
            },
            None => self.checkpoints.after_end(parent).is_some(),
        }
    }

    /// Like [`Pass::has_reached`] for a child that is already gone. `next`
    /// is the sibling that followed `removed`, `None` when it was last.
    pub(crate) fn has_reached_gap(
        &self,
        tree: &DocTree,
        parent: NodeKey,
        removed: NodeKey,
        next: Option<NodeKey>,
    ) -> bool {
        if self.is_finished() {
            return true;
        }
        match self.frames.iter().find(|frame| frame.node == parent) {
            Some(frame) => match (frame.stage, frame.cursor) {
                (Stage::EndTag, _) => true,
                (_, None) => false,
                (_, Some(cursor)) if cursor == removed => true,
                (_, Some(cursor)) => {
                    let gap = match next {
                        Some(next) => tree.index_in_parent(next),
                        None => Some(tree.children(parent).len()),
                    };
                    match (gap, tree.index_in_parent(cursor)) {
                        (Some(gap), Some(cursor_at)) => gap <= cursor_at,
                        _ => true,
                    }
                }
            },
            None => self.checkpoints.after_end(parent).is_some(),
        }
    }

    /// The checkpoint a restart at the gap after `previous` under `parent`
    /// resumes from: the after-end of the nearest walked sibling at or
    /// before `previous`, else the after-start of `parent`.
    pub(crate) fn base_before(
        &self,
        tree: &DocTree,
        parent: NodeKey,
        previous: Option<NodeKey>,
    ) -> Option<(usize, Checkpoint)> {
        let mut current = previous;
        while let Some(sibling) = current {
            if tree.class(sibling).is_some_and(NodeClass::is_walked) {
                return self.checkpoints.lookup(sibling, CheckpointKind::AfterEnd);
            }
            current = tree.previous_sibling(sibling);
        }
        self.checkpoints.lookup(parent, CheckpointKind::AfterStart)
    }

    /// Rolls the pass back to `base`, the checkpoint at position `record` in
    /// the store. The walker is rebuilt by replaying the kept prefix of the
    /// log into `fresh`, and the frame stack is rebuilt from the tree.
    ///
    /// Returns the number of errors kept.
    pub(crate) fn rewind(
        &mut self,
        tree: &DocTree,
        record: usize,
        base: Checkpoint,
        fresh: W,
    ) -> Result<usize, ValidatorError> {
        let innermost = match base.kind {
            CheckpointKind::AfterStart => base.node,
            CheckpointKind::AfterEnd => tree
                .parent(base.node)
                .ok_or(ValidatorError::DetachedCursor { node: base.node })?,
        };
        if base.event_index > self.log.len() {
            return Err(ValidatorError::StaleCheckpoint { node: base.node });
        }
        let path = tree.path_from_root(innermost);
        if path.first() != Some(&tree.root()) {
            return Err(ValidatorError::DetachedCursor { node: innermost });
        }

        let mut resolver = NameResolver::new();
        let mut frames = Vec::with_capacity(path.len());
        for (depth, &node) in path.iter().enumerate() {
            let class = tree
                .class(node)
                .ok_or(ValidatorError::UnknownNode { node })?;
            let start = self
                .checkpoints
                .after_start(node)
                .ok_or(ValidatorError::MissingStartCheckpoint { node })?;
            let child = path.get(depth + 1).copied();
            let done = match child {
                Some(child) => {
                    self.checkpoints
                        .after_start(child)
                        .ok_or(ValidatorError::MissingStartCheckpoint { node: child })?
                        .done
                }
                None => base.done,
            };
            let mut frame = Frame::new(
                node,
                class,
                Stage::Contents,
                ProgressFrame {
                    done,
                    portion: start.portion,
                },
            );
            frame.cursor = match (child, base.kind) {
                (Some(child), _) => Some(child),
                (None, CheckpointKind::AfterEnd) => Some(base.node),
                (None, CheckpointKind::AfterStart) => None,
            };
            if class.emits_tags()
                && let Some(data) = tree.element(node)
            {
                resolver.enter_context();
                resolver.apply_declarations(&data.attributes);
                frame.name = Some(
                    resolver
                        .resolve_element(&data.name)
                        .unwrap_or_else(|_| unresolved_fallback(&data.name)),
                );
            }
            frames.push(frame);
        }

        let log = self.log.prefix(base.event_index);
        let mut walker = fresh;
        for event in log.events() {
            let _ = walker.fire_event(event);
        }
        log::debug!(
            target: "validator.projector",
            "rewind to {:?} of {} ({} events kept)",
            base.kind,
            base.node,
            log.len()
        );

        self.checkpoints.truncate(record + 1);
        self.errors.truncate(base.error_count);
        self.log = log;
        self.walker = walker;
        self.frames = frames;
        self.resolver = resolver;
        self.part_done = base.done;
        Ok(self.errors.len())
    }

    /// Frames still attached to the tree.
    pub(crate) fn frames_attached(&self, tree: &DocTree) -> bool {
        self.frames.iter().all(|frame| tree.is_attached(frame.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree::parse_markup;
    use grammar::{Grammar, RuleGrammar};
    use pretty_assertions::assert_eq;

    const GRAMMAR: &str = r#"
namespace = "urn:d"
start = ["doc"]

[[element]]
name = "doc"
content = [{ element = "p", occurs = "zero-or-more" }]

[[element]]
name = "p"
text = true
content = [{ element = "p", occurs = "zero-or-more" }]

[[element.attribute]]
name = "n"
"#;

    fn run(tree: &DocTree) -> Pass<grammar::RuleWalker> {
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let mut pass = Pass::new(grammar.new_walker(), tree.root());
        while pass.cycle(tree, &[]).unwrap() == Step::Continue {}
        pass
    }

    fn d(local: &str) -> Name {
        Name::new("urn:d", local)
    }

    #[test]
    fn wrappers_and_placeholders_fire_nothing_of_their_own() {
        let tree = parse_markup(concat!(
            r#"<doc xmlns="urn:d"><w _role="wrapper"><p n="1" _caret="x">hi</p></w>"#,
            "\n",
            r#"<ph _role="placeholder"><p/></ph></doc>"#,
        ))
        .unwrap();
        let pass = run(&tree);
        assert_eq!(
            pass.log.events(),
            &[
                Event::EnterStartTag(d("doc")),
                Event::LeaveStartTag,
                Event::EnterStartTag(d("p")),
                Event::AttributeName(Name::local("n")),
                Event::AttributeValue("1".into()),
                Event::LeaveStartTag,
                Event::Text("hi".into()),
                Event::EndTag(d("p")),
                Event::EndTag(d("doc")),
            ]
        );
        assert!(pass.errors.is_empty(), "{:?}", pass.errors);
        assert!(pass.is_finished());
    }

    #[test]
    fn every_walked_node_gets_both_checkpoints() {
        let tree = parse_markup(r#"<doc xmlns="urn:d"><p n="1">a</p><p n="2"><p/></p></doc>"#).unwrap();
        let pass = run(&tree);
        for node in tree.descendants(tree.root()) {
            if tree.class(node).is_some_and(NodeClass::is_walked) {
                let start = pass.checkpoints.after_start(node).unwrap();
                let end = pass.checkpoints.after_end(node).unwrap();
                assert!(start.event_index < end.event_index);
            }
        }
        let root = pass.checkpoints.after_end(tree.root()).unwrap();
        assert_eq!(root.event_index, pass.log.len());
        assert_eq!(root.done, 1.0);
    }

    #[test]
    fn progress_splits_evenly_and_never_goes_back() {
        let tree = parse_markup(r#"<doc xmlns="urn:d"><p/><p><p/><p/></p></doc>"#).unwrap();
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let mut pass = Pass::new(grammar.new_walker(), tree.root());
        let mut seen = vec![pass.part_done];
        while pass.cycle(&tree, &[]).unwrap() == Step::Continue {
            seen.push(pass.part_done);
        }
        seen.push(pass.part_done);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
        seen.dedup();
        assert_eq!(seen, vec![0.0, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn unbound_prefix_is_reported_and_local_name_fired() {
        let tree = parse_markup(r#"<x:doc/>"#).unwrap();
        let pass = run(&tree);
        assert_eq!(pass.log.events()[0], Event::EnterStartTag(Name::local("doc")));
        assert!(matches!(
            &pass.errors[0].violation,
            Violation::UnresolvedPrefix { prefix, name } if prefix == "x" && name == "x:doc"
        ));
        assert_eq!(pass.errors[0].event, None);
        assert_eq!(pass.errors[0].event_index, 0);
    }

    #[test]
    fn errors_attach_to_the_node_that_caused_them() {
        let tree = parse_markup(r#"<doc xmlns="urn:d">stray<p m="1"/></doc>"#).unwrap();
        let pass = run(&tree);
        let doc = tree.children(tree.root())[0];
        let stray = tree.children(doc)[0];
        let p = tree.children(doc)[1];
        let nodes: Vec<_> = pass.errors.iter().map(|e| (e.node, e.offset)).collect();
        assert_eq!(nodes, vec![(stray, 0), (p, 0)]);
        assert!(matches!(
            pass.errors[1].violation,
            Violation::Grammar(GrammarError::AttributeNotAllowed { .. })
        ));
        for error in &pass.errors {
            let event = error.event.as_ref().unwrap();
            assert_eq!(&pass.log.events()[error.event_index], event);
        }
    }

    #[test]
    fn rewind_then_continue_reproduces_the_cold_pass() {
        let tree = parse_markup(r#"<doc xmlns="urn:d"><p n="1">a</p><p>b<p/></p><p/></doc>"#).unwrap();
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let cold = run(&tree);

        let doc = tree.children(tree.root())[0];
        let first = tree.children(doc)[0];
        for previous in [None, Some(first)] {
            let mut pass = run(&tree);
            let (record, base) = pass.base_before(&tree, doc, previous).unwrap();
            pass.rewind(&tree, record, base, grammar.new_walker()).unwrap();
            assert!(!pass.is_finished());
            while pass.cycle(&tree, &[]).unwrap() == Step::Continue {}
            assert_eq!(pass.log.events(), cold.log.events());
            assert_eq!(pass.errors, cold.errors);
            assert_eq!(
                pass.checkpoints.iter().copied().collect::<Vec<_>>(),
                cold.checkpoints.iter().copied().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn has_reached_follows_the_cursor() {
        let tree = parse_markup(r#"<doc xmlns="urn:d"><p/><p/></doc>"#).unwrap();
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let doc = tree.children(tree.root())[0];
        let (first, second) = (tree.children(doc)[0], tree.children(doc)[1]);
        let mut pass = Pass::new(grammar.new_walker(), tree.root());
        assert!(!pass.has_reached(&tree, doc, first));
        // root contents, doc start tag, doc contents
        for _ in 0..3 {
            pass.cycle(&tree, &[]).unwrap();
        }
        assert!(pass.has_reached(&tree, doc, first));
        assert!(!pass.has_reached(&tree, doc, second));
        while pass.cycle(&tree, &[]).unwrap() == Step::Continue {}
        assert!(pass.has_reached(&tree, doc, second));
    }

    #[test]
    fn subtree_projection_skips_the_end_check() {
        let tree = parse_markup(r#"<p xmlns="urn:d" n="1">x</p>"#).unwrap();
        let grammar = RuleGrammar::from_toml_str(GRAMMAR).unwrap();
        let mut walker = grammar.new_walker();
        walker.fire_event(&Event::EnterStartTag(d("doc"))).unwrap();
        walker.fire_event(&Event::LeaveStartTag).unwrap();
        let mut pass = Pass::detached(walker, NameResolver::new());
        let p = tree.children(tree.root())[0];
        pass.project_subtree(&tree, p).unwrap();
        assert!(pass.errors.is_empty(), "{:?}", pass.errors);
        assert_eq!(pass.log.len(), 6);
    }
}
