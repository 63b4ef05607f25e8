//! Answers "what may come next here" for arbitrary positions.
//!
//! A query finds the checkpoint nearest before the position, forces the
//! running pass forward until that checkpoint exists, and replays the log up
//! to it into a fresh walker. Text between the checkpoint and the position is
//! fired as one trial `text` event that is not recorded anywhere.

use crate::checkpoint::{Checkpoint, CheckpointKind};
use crate::error::ValidatorError;
use crate::projector::{fire_text_if_needed, unresolved_fallback};
use crate::scheduler::TaskScheduler;
use crate::validator::Validator;
use core_types::NodeKey;
use doctree::{DocTree, NameResolver, NodeClass};
use grammar::{Event, EventDescriptor, EventSet, Grammar, GrammarWalker};

/// A caret-like position: a child index in an element, or a character
/// offset in a text node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub container: NodeKey,
    pub offset: usize,
}

impl Position {
    pub fn new(container: NodeKey, offset: usize) -> Self {
        Self { container, offset }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    /// Before any event: a fresh walker answers.
    Fresh,
    Checkpoint(NodeKey, CheckpointKind),
}

#[derive(Debug)]
struct ReplayPlan {
    anchor: Anchor,
    trial_text: Option<String>,
}

/// Nearest checkpoint before child `index` of `parent`, plus the text of any
/// text nodes between it and the index.
fn anchor_before(tree: &DocTree, parent: NodeKey, index: usize) -> (Anchor, Option<String>) {
    let mut pieces = Vec::new();
    let mut anchor = Anchor::Checkpoint(parent, CheckpointKind::AfterStart);
    for &child in tree.children(parent)[..index].iter().rev() {
        match tree.class(child) {
            Some(NodeClass::Element | NodeClass::Wrapper) => {
                anchor = Anchor::Checkpoint(child, CheckpointKind::AfterEnd);
                break;
            }
            Some(NodeClass::Text) => pieces.push(tree.text(child).unwrap_or_default()),
            _ => {}
        }
    }
    let between = (!pieces.is_empty()).then(|| pieces.iter().rev().copied().collect());
    (anchor, between)
}

fn plan(tree: &DocTree, position: Position) -> Result<ReplayPlan, ValidatorError> {
    let Position { container, offset } = position;
    let class = tree
        .class(container)
        .ok_or(ValidatorError::UnknownNode { node: container })?;
    if !tree.is_attached(container) {
        return Err(ValidatorError::DetachedCursor { node: container });
    }
    let path = tree.path_from_root(container);
    let ancestors = &path[..path.len().saturating_sub(1)];
    if ancestors.iter().any(|&node| {
        !matches!(
            tree.class(node),
            Some(NodeClass::Root | NodeClass::Element | NodeClass::Wrapper)
        )
    }) {
        return Err(ValidatorError::NotAContainer { node: container });
    }
    let out_of_range = ValidatorError::OffsetOutOfRange {
        node: container,
        offset,
    };

    match class {
        NodeClass::Root => {
            let children = tree.children(container);
            if offset > children.len() {
                return Err(out_of_range);
            }
            let past_content = children[..offset]
                .iter()
                .any(|&child| tree.class(child).is_some_and(NodeClass::is_walked));
            let anchor = if past_content {
                Anchor::Checkpoint(container, CheckpointKind::AfterEnd)
            } else {
                Anchor::Fresh
            };
            Ok(ReplayPlan {
                anchor,
                trial_text: None,
            })
        }
        NodeClass::Text => {
            let text = tree.text(container).unwrap_or_default();
            let byte = text
                .char_indices()
                .map(|(at, _)| at)
                .chain([text.len()])
                .nth(offset)
                .ok_or(out_of_range)?;
            let parent = tree
                .parent(container)
                .ok_or(ValidatorError::DetachedCursor { node: container })?;
            let index = tree
                .index_in_parent(container)
                .ok_or(ValidatorError::DetachedCursor { node: container })?;
            let (anchor, between) = anchor_before(tree, parent, index);
            let trial_text = match (between, offset) {
                (None, 0) => None,
                (between, _) => Some(between.unwrap_or_default() + &text[..byte]),
            };
            Ok(ReplayPlan { anchor, trial_text })
        }
        NodeClass::Element | NodeClass::Wrapper => {
            if offset > tree.children(container).len() {
                return Err(out_of_range);
            }
            let (anchor, trial_text) = anchor_before(tree, container, offset);
            Ok(ReplayPlan { anchor, trial_text })
        }
        NodeClass::Placeholder | NodeClass::Decoration => {
            Err(ValidatorError::NotAContainer { node: container })
        }
    }
}

impl<G: Grammar, S: TaskScheduler> Validator<G, S> {
    /// Walker in the state the grammar is in at `position`.
    pub fn walker_at(&mut self, tree: &DocTree, position: Position) -> Result<G::Walker, ValidatorError> {
        let plan = plan(tree, position)?;
        let mut walker = self.grammar.new_walker();
        let Anchor::Checkpoint(node, kind) = plan.anchor else {
            return Ok(walker);
        };
        let checkpoint = self.validate_up_to(tree, node, kind)?;
        let events = self
            .pass
            .as_ref()
            .and_then(|pass| pass.log.events().get(..checkpoint.event_index))
            .ok_or(ValidatorError::StaleCheckpoint { node })?;
        log::debug!(
            target: "validator.query",
            "replaying {} events for {position:?}",
            events.len()
        );
        for event in events {
            let _ = walker.fire_event(event);
        }
        if let Some(text) = plan.trial_text {
            let _ = fire_text_if_needed(&mut walker, &text);
        }
        Ok(walker)
    }

    /// Events the grammar would accept at `position`.
    pub fn possible_at(&mut self, tree: &DocTree, position: Position) -> Result<EventSet, ValidatorError> {
        Ok(self.walker_at(tree, position)?.possible())
    }

    /// Child indices of `container` at which the grammar would accept
    /// `event`, in increasing order.
    pub fn possible_where(
        &mut self,
        tree: &DocTree,
        container: NodeKey,
        event: &EventDescriptor,
    ) -> Result<Vec<usize>, ValidatorError> {
        match tree.class(container) {
            Some(NodeClass::Root | NodeClass::Element | NodeClass::Wrapper) => {}
            Some(_) => return Err(ValidatorError::NotAContainer { node: container }),
            None => return Err(ValidatorError::UnknownNode { node: container }),
        }
        let mut indices = Vec::new();
        for index in 0..=tree.children(container).len() {
            if self
                .possible_at(tree, Position::new(container, index))?
                .contains(event)
            {
                indices.push(index);
            }
        }
        Ok(indices)
    }

    /// Events the grammar would accept inside the start tag of `element`,
    /// after its current attributes. Used for attribute completion.
    pub fn possible_attributes_at(
        &mut self,
        tree: &DocTree,
        element: NodeKey,
    ) -> Result<EventSet, ValidatorError> {
        let data = tree
            .element(element)
            .ok_or(ValidatorError::UnknownNode { node: element })?;
        if tree.class(element) != Some(NodeClass::Element) {
            return Err(ValidatorError::NotAContainer { node: element });
        }
        let detached = ValidatorError::DetachedCursor { node: element };
        let parent = tree.parent(element).ok_or(detached.clone())?;
        let index = tree.index_in_parent(element).ok_or(detached)?;
        let mut walker = self.walker_at(tree, Position::new(parent, index))?;

        let resolver = NameResolver::for_ancestors(tree, element);
        let name = resolver
            .resolve_element(&data.name)
            .unwrap_or_else(|_| unresolved_fallback(&data.name));
        let _ = walker.fire_event(&Event::EnterStartTag(name));
        for attr in data.data_attributes() {
            let attr_name = resolver
                .resolve_attribute(&attr.name)
                .unwrap_or_else(|_| unresolved_fallback(&attr.name));
            let _ = walker.fire_event(&Event::AttributeName(attr_name));
            let _ = walker.fire_event(&Event::AttributeValue(attr.value.clone()));
        }
        Ok(walker.possible())
    }

    /// Runs cycles until the checkpoint exists.
    fn validate_up_to(
        &mut self,
        tree: &DocTree,
        node: NodeKey,
        kind: CheckpointKind,
    ) -> Result<Checkpoint, ValidatorError> {
        if self.pass.is_none() {
            self.reset(tree);
        }
        let mut forced = 0usize;
        loop {
            let pass = self
                .pass
                .as_ref()
                .ok_or(ValidatorError::StaleCheckpoint { node })?;
            if let Some(checkpoint) = pass.checkpoints.get(node, kind) {
                if forced > 0 {
                    log::trace!(target: "validator.query", "forced {forced} cycles to reach {node}");
                }
                return Ok(checkpoint);
            }
            if pass.is_finished() {
                return Err(ValidatorError::StaleCheckpoint { node });
            }
            self.step(tree)?;
            forced += 1;
        }
    }
}
