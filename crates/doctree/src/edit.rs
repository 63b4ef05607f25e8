//! Tree edit protocol and mutation notifications.
//!
//! Edits are the only way the editor changes a [`DocTree`](crate::DocTree).
//! Every edit that touches the attached document produces one or more
//! [`TreeMutation`]s, delivered synchronously to a [`MutationSink`] before
//! `apply` returns.
//!
//! Invariants:
//! - Edits are applied in order.
//! - Keys must be non-zero and are never reused, not even after removal.
//! - References must point to live keys at the time they are used (except
//!   the `key` in create operations).
//! - A node has at most one parent; edits must not create cycles.
//! - Detached nodes (created but not yet inserted, or inside a detached
//!   subtree) produce no notifications.

use crate::node::{Attribute, ElementRole};
use core_types::NodeKey;
use std::sync::Arc;

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEdit {
    /// Create a detached element.
    CreateElement {
        key: NodeKey,
        name: Arc<str>,
        role: ElementRole,
        attributes: Vec<Attribute>,
    },
    /// Create a detached text node.
    CreateText { key: NodeKey, text: String },
    /// Append a child to the end of a parent's children list.
    AppendChild { parent: NodeKey, child: NodeKey },
    /// Insert a child before an existing sibling.
    InsertBefore {
        parent: NodeKey,
        child: NodeKey,
        before: NodeKey,
    },
    /// Remove a node and its entire subtree. The keys become dead.
    RemoveNode { key: NodeKey },
    /// Set (`Some`) or remove (`None`) one attribute of an element.
    SetAttribute {
        key: NodeKey,
        name: Arc<str>,
        value: Option<String>,
    },
    /// Replace the value of a text node.
    SetText { key: NodeKey, text: String },
}

/// Notification of a change to the attached document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeMutation {
    NodeInserted {
        node: NodeKey,
        parent: NodeKey,
    },
    /// Sent while the node is still in place.
    NodeWillBeRemoved {
        node: NodeKey,
        parent: NodeKey,
    },
    /// Sent once the node is gone; siblings describe where it used to be.
    NodeRemoved {
        node: NodeKey,
        parent: NodeKey,
        previous_sibling: Option<NodeKey>,
        next_sibling: Option<NodeKey>,
    },
    TextChanged {
        node: NodeKey,
        parent: NodeKey,
    },
    AttributeChanged {
        node: NodeKey,
        name: Arc<str>,
    },
}

/// Receiver of mutation notifications.
pub trait MutationSink {
    fn notify(&mut self, mutation: TreeMutation);
}

impl MutationSink for Vec<TreeMutation> {
    fn notify(&mut self, mutation: TreeMutation) {
        self.push(mutation);
    }
}

/// Sink that drops every notification (bulk loading).
pub struct NullSink;

impl MutationSink for NullSink {
    fn notify(&mut self, _mutation: TreeMutation) {}
}
