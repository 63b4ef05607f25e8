//! Checkpoints and the event log.
//!
//! Invariants:
//! - Records are kept in the order they were taken, which is document order
//!   within one pass. Dropping every record after a given one therefore
//!   drops exactly the state that follows that point in the document.
//! - A node has at most one checkpoint of each kind.
//! - `event_index` of a record never exceeds the length of the log it was
//!   taken against.

use core_types::{EventIndex, NodeKey};
use grammar::Event;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckpointKind {
    /// Taken once the start tag events of the node were fired.
    AfterStart,
    /// Taken once the end tag event of the node was fired.
    AfterEnd,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Checkpoint {
    pub node: NodeKey,
    pub kind: CheckpointKind,
    /// Log length at the checkpoint.
    pub event_index: EventIndex,
    /// Number of errors recorded before the checkpoint.
    pub error_count: usize,
    /// Fraction of the document done at the checkpoint.
    pub done: f64,
    /// Share of the document covered by the node.
    pub portion: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slots {
    after_start: Option<usize>,
    after_end: Option<usize>,
}

impl Slots {
    fn get_mut(&mut self, kind: CheckpointKind) -> &mut Option<usize> {
        match kind {
            CheckpointKind::AfterStart => &mut self.after_start,
            CheckpointKind::AfterEnd => &mut self.after_end,
        }
    }

    fn get(&self, kind: CheckpointKind) -> Option<usize> {
        match kind {
            CheckpointKind::AfterStart => self.after_start,
            CheckpointKind::AfterEnd => self.after_end,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CheckpointStore {
    records: Vec<Checkpoint>,
    by_node: HashMap<NodeKey, Slots>,
}

impl CheckpointStore {
    pub(crate) fn record(&mut self, checkpoint: Checkpoint) {
        let index = self.records.len();
        self.records.push(checkpoint);
        *self
            .by_node
            .entry(checkpoint.node)
            .or_default()
            .get_mut(checkpoint.kind) = Some(index);
    }

    /// The checkpoint and its position in recording order.
    pub(crate) fn lookup(&self, node: NodeKey, kind: CheckpointKind) -> Option<(usize, Checkpoint)> {
        let index = self.by_node.get(&node)?.get(kind)?;
        Some((index, self.records[index]))
    }

    pub(crate) fn get(&self, node: NodeKey, kind: CheckpointKind) -> Option<Checkpoint> {
        self.lookup(node, kind).map(|(_, checkpoint)| checkpoint)
    }

    pub(crate) fn after_start(&self, node: NodeKey) -> Option<Checkpoint> {
        self.get(node, CheckpointKind::AfterStart)
    }

    pub(crate) fn after_end(&self, node: NodeKey) -> Option<Checkpoint> {
        self.get(node, CheckpointKind::AfterEnd)
    }

    /// Keeps the first `len` records.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.records.len() {
            return;
        }
        for dropped in self.records.drain(len..) {
            if let Some(slots) = self.by_node.get_mut(&dropped.node) {
                let slot = slots.get_mut(dropped.kind);
                if slot.is_some_and(|index| index >= len) {
                    *slot = None;
                }
                if slots.after_start.is_none() && slots.after_end.is_none() {
                    self.by_node.remove(&dropped.node);
                }
            }
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Checkpoint> + '_ {
        self.records.iter()
    }
}

/// Events fired since the pass began, in firing order.
#[derive(Clone, Debug, Default)]
pub(crate) struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub(crate) fn push(&mut self, event: Event) -> EventIndex {
        self.events.push(event);
        self.events.len() - 1
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn events(&self) -> &[Event] {
        &self.events
    }

    /// A new log holding the first `len` events.
    pub(crate) fn prefix(&self, len: usize) -> EventLog {
        EventLog {
            events: self.events[..len.min(self.events.len())].to_vec(),
        }
    }
}
