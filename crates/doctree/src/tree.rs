use crate::edit::{MutationSink, TreeEdit, TreeMutation};
use crate::node::{Attribute, ElementData, ElementRole, NodeClass, NodeKind};
use core_types::NodeKey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node key {0} is reserved")]
    InvalidKey(NodeKey),
    #[error("node key {0} was already allocated")]
    DuplicateKey(NodeKey),
    #[error("node {0} does not exist")]
    MissingKey(NodeKey),
    #[error("node {0} has the wrong kind for this edit")]
    WrongNodeKind(NodeKey),
    #[error("node {0} cannot take this parent")]
    InvalidParent(NodeKey),
    #[error("{before} is not a child of {parent}")]
    InvalidSibling { parent: NodeKey, before: NodeKey },
    #[error("inserting {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeKey, child: NodeKey },
    #[error("the root node cannot be removed")]
    RootRemoval,
}

#[derive(Debug)]
struct NodeRecord {
    kind: NodeKind,
    class: NodeClass,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// Arena-backed document tree.
///
/// The root node contains the document but is not part of it; the document
/// element and any top-level text are its children.
///
/// Slots of removed nodes are recycled for later nodes. Their keys are not:
/// `allocated` remembers every key ever handed out.
#[derive(Debug)]
pub struct DocTree {
    nodes: Vec<NodeRecord>,
    /// Arena slots no live key points to.
    free: Vec<usize>,
    live: HashMap<NodeKey, usize>,
    allocated: HashSet<NodeKey>,
    root: NodeKey,
    next_key: u32,
}

impl DocTree {
    pub fn new() -> Self {
        let root = NodeKey(1);
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            live: HashMap::new(),
            allocated: HashSet::new(),
            root,
            next_key: 2,
        };
        tree.insert_node(root, NodeKind::Root);
        tree
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Returns a fresh key that has never been used in this tree.
    pub fn allocate_key(&mut self) -> NodeKey {
        loop {
            let key = NodeKey(self.next_key);
            self.next_key = self.next_key.wrapping_add(1).max(1);
            if !self.allocated.contains(&key) {
                return key;
            }
        }
    }

    pub fn apply(
        &mut self,
        edit: TreeEdit,
        sink: &mut dyn MutationSink,
    ) -> Result<(), TreeError> {
        log::trace!(target: "doctree.apply", "apply {edit:?}");
        match edit {
            TreeEdit::CreateElement {
                key,
                name,
                role,
                attributes,
            } => {
                self.ensure_new(key)?;
                self.insert_node(
                    key,
                    NodeKind::Element(ElementData {
                        name,
                        role,
                        attributes,
                    }),
                );
            }
            TreeEdit::CreateText { key, text } => {
                self.ensure_new(key)?;
                self.insert_node(key, NodeKind::Text(text));
            }
            TreeEdit::AppendChild { parent, child } => {
                self.check_insertion(parent, child)?;
                let parent_index = self.index(parent)?;
                self.nodes[parent_index].children.push(child);
                let child_index = self.index(child)?;
                self.nodes[child_index].parent = Some(parent);
                if self.is_attached(parent) {
                    sink.notify(TreeMutation::NodeInserted {
                        node: child,
                        parent,
                    });
                }
            }
            TreeEdit::InsertBefore {
                parent,
                child,
                before,
            } => {
                self.check_insertion(parent, child)?;
                if self.parent(before) != Some(parent) {
                    return Err(TreeError::InvalidSibling { parent, before });
                }
                let parent_index = self.index(parent)?;
                let siblings = &mut self.nodes[parent_index].children;
                let pos = siblings
                    .iter()
                    .position(|k| *k == before)
                    .ok_or(TreeError::InvalidSibling { parent, before })?;
                siblings.insert(pos, child);
                let child_index = self.index(child)?;
                self.nodes[child_index].parent = Some(parent);
                if self.is_attached(parent) {
                    sink.notify(TreeMutation::NodeInserted {
                        node: child,
                        parent,
                    });
                }
            }
            TreeEdit::RemoveNode { key } => {
                if key == self.root {
                    return Err(TreeError::RootRemoval);
                }
                let index = self.index(key)?;
                let attached = self.is_attached(key);
                let parent = self.nodes[index].parent;
                let (previous_sibling, next_sibling) =
                    (self.previous_sibling(key), self.next_sibling(key));
                if attached && let Some(parent) = parent {
                    sink.notify(TreeMutation::NodeWillBeRemoved { node: key, parent });
                }
                if let Some(parent) = parent {
                    let parent_index = self.index(parent)?;
                    self.nodes[parent_index].children.retain(|k| *k != key);
                }
                self.remove_subtree(key);
                if attached && let Some(parent) = parent {
                    sink.notify(TreeMutation::NodeRemoved {
                        node: key,
                        parent,
                        previous_sibling,
                        next_sibling,
                    });
                }
            }
            TreeEdit::SetAttribute { key, name, value } => {
                let index = self.index(key)?;
                let NodeKind::Element(data) = &mut self.nodes[index].kind else {
                    return Err(TreeError::WrongNodeKind(key));
                };
                let existing = data.attributes.iter().position(|attr| attr.name == name);
                match (existing, value) {
                    (Some(pos), Some(value)) => data.attributes[pos].value = value,
                    (None, Some(value)) => data.attributes.push(Attribute {
                        name: Arc::clone(&name),
                        value,
                    }),
                    (Some(pos), None) => {
                        data.attributes.remove(pos);
                    }
                    (None, None) => return Ok(()),
                }
                if self.is_attached(key) {
                    sink.notify(TreeMutation::AttributeChanged { node: key, name });
                }
            }
            TreeEdit::SetText { key, text } => {
                let index = self.index(key)?;
                let NodeKind::Text(existing) = &mut self.nodes[index].kind else {
                    return Err(TreeError::WrongNodeKind(key));
                };
                *existing = text;
                if self.is_attached(key)
                    && let Some(parent) = self.nodes[index].parent
                {
                    sink.notify(TreeMutation::TextChanged { node: key, parent });
                }
            }
        }
        Ok(())
    }

    /// Creates an element and appends it to `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeKey,
        name: &str,
        role: ElementRole,
        attributes: Vec<Attribute>,
        sink: &mut dyn MutationSink,
    ) -> Result<NodeKey, TreeError> {
        let key = self.allocate_key();
        self.apply(
            TreeEdit::CreateElement {
                key,
                name: Arc::from(name),
                role,
                attributes,
            },
            sink,
        )?;
        self.apply(TreeEdit::AppendChild { parent, child: key }, sink)?;
        Ok(key)
    }

    /// Creates a text node and appends it to `parent`.
    pub fn append_text(
        &mut self,
        parent: NodeKey,
        text: &str,
        sink: &mut dyn MutationSink,
    ) -> Result<NodeKey, TreeError> {
        let key = self.allocate_key();
        self.apply(
            TreeEdit::CreateText {
                key,
                text: text.to_string(),
            },
            sink,
        )?;
        self.apply(TreeEdit::AppendChild { parent, child: key }, sink)?;
        Ok(key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.live.contains_key(&key)
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.record(key).map(|record| &record.kind)
    }

    pub fn class(&self, key: NodeKey) -> Option<NodeClass> {
        self.record(key).map(|record| record.class)
    }

    pub fn element(&self, key: NodeKey) -> Option<&ElementData> {
        match self.kind(key)? {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn text(&self, key: NodeKey) -> Option<&str> {
        match self.kind(key)? {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.record(key)?.parent
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.record(key)
            .map(|record| record.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn first_child(&self, key: NodeKey) -> Option<NodeKey> {
        self.children(key).first().copied()
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|k| *k == key)
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Whether `key` is live and reachable from the root.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut current = key;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut current = Some(node);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.parent(key);
        }
        false
    }

    /// Ancestors of `key` from the root down to `key` itself.
    pub fn path_from_root(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut path = Vec::new();
        let mut current = Some(key);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }
        path.reverse();
        path
    }

    /// Pre-order traversal of the subtree rooted at `key`.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    fn record(&self, key: NodeKey) -> Option<&NodeRecord> {
        self.live.get(&key).map(|&index| &self.nodes[index])
    }

    fn index(&self, key: NodeKey) -> Result<usize, TreeError> {
        if !key.is_valid() {
            return Err(TreeError::InvalidKey(key));
        }
        self.live
            .get(&key)
            .copied()
            .ok_or(TreeError::MissingKey(key))
    }

    fn ensure_new(&self, key: NodeKey) -> Result<(), TreeError> {
        if !key.is_valid() {
            return Err(TreeError::InvalidKey(key));
        }
        if self.allocated.contains(&key) {
            return Err(TreeError::DuplicateKey(key));
        }
        Ok(())
    }

    fn insert_node(&mut self, key: NodeKey, kind: NodeKind) {
        let class = NodeClass::of(&kind);
        let record = NodeRecord {
            kind,
            class,
            parent: None,
            children: Vec::new(),
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = record;
                index
            }
            None => {
                self.nodes.push(record);
                self.nodes.len() - 1
            }
        };
        self.allocated.insert(key);
        self.live.insert(key, index);
        if key.0 >= self.next_key {
            self.next_key = key.0.wrapping_add(1).max(1);
        }
    }

    fn check_insertion(&self, parent: NodeKey, child: NodeKey) -> Result<(), TreeError> {
        let parent_index = self.index(parent)?;
        let child_index = self.index(child)?;
        if parent == child || self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::CycleDetected { parent, child });
        }
        if !self.nodes[parent_index].class.can_have_children() {
            return Err(TreeError::InvalidParent(parent));
        }
        if child == self.root || self.nodes[child_index].parent.is_some() {
            return Err(TreeError::InvalidParent(child));
        }
        Ok(())
    }

    fn remove_subtree(&mut self, key: NodeKey) {
        let mut stack = vec![key];
        while let Some(node) = stack.pop() {
            if let Some(index) = self.live.remove(&node) {
                let record = &mut self.nodes[index];
                record.parent = None;
                record.kind = NodeKind::Text(String::new());
                stack.append(&mut record.children);
                self.free.push(index);
            }
        }
    }
}

impl Default for DocTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::NullSink;

    #[test]
    fn root_is_attached_and_classified() {
        let tree = DocTree::new();
        assert!(tree.is_attached(tree.root()));
        assert_eq!(tree.class(tree.root()), Some(NodeClass::Root));
    }

    #[test]
    fn allocated_keys_are_never_reused() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let a = tree
            .append_element(root, "a", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        tree.apply(TreeEdit::RemoveNode { key: a }, &mut NullSink)
            .unwrap();
        let b = tree.allocate_key();
        assert_ne!(a, b);
        assert_eq!(
            tree.apply(
                TreeEdit::CreateText {
                    key: a,
                    text: String::new()
                },
                &mut NullSink
            ),
            Err(TreeError::DuplicateKey(a))
        );
    }

    #[test]
    fn rejects_cycles_and_second_parents() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let a = tree
            .append_element(root, "a", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        let b = tree
            .append_element(a, "b", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        assert_eq!(
            tree.apply(TreeEdit::AppendChild { parent: b, child: a }, &mut NullSink),
            Err(TreeError::CycleDetected { parent: b, child: a })
        );
        assert_eq!(
            tree.apply(TreeEdit::AppendChild { parent: root, child: b }, &mut NullSink),
            Err(TreeError::InvalidParent(b))
        );
    }

    #[test]
    fn text_nodes_cannot_take_children() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let t = tree.append_text(root, "x", &mut NullSink).unwrap();
        let key = tree.allocate_key();
        tree.apply(
            TreeEdit::CreateText {
                key,
                text: "y".into(),
            },
            &mut NullSink,
        )
        .unwrap();
        assert_eq!(
            tree.apply(TreeEdit::AppendChild { parent: t, child: key }, &mut NullSink),
            Err(TreeError::InvalidParent(t))
        );
    }

    #[test]
    fn removal_kills_the_whole_subtree() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let a = tree
            .append_element(root, "a", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        let b = tree
            .append_element(a, "b", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        let t = tree.append_text(b, "hi", &mut NullSink).unwrap();
        tree.apply(TreeEdit::RemoveNode { key: a }, &mut NullSink)
            .unwrap();
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert!(!tree.contains(t));
        assert!(tree.children(root).is_empty());
        assert_eq!(
            tree.apply(TreeEdit::RemoveNode { key: root }, &mut NullSink),
            Err(TreeError::RootRemoval)
        );
    }

    #[test]
    fn removed_slots_are_recycled() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let mut keys = Vec::new();
        for round in 0..50 {
            let a = tree
                .append_element(root, "a", ElementRole::Real, Vec::new(), &mut NullSink)
                .unwrap();
            tree.append_text(a, &round.to_string(), &mut NullSink).unwrap();
            keys.push(a);
            tree.apply(TreeEdit::RemoveNode { key: a }, &mut NullSink)
                .unwrap();
        }
        assert_eq!(tree.nodes.len(), 3);
        keys.dedup();
        assert_eq!(keys.len(), 50);

        let b = tree
            .append_element(root, "b", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        let t = tree.append_text(b, "kept", &mut NullSink).unwrap();
        assert_eq!(tree.text(t), Some("kept"));
        assert_eq!(tree.element(b).map(|data| &*data.name), Some("b"));
        assert_eq!(tree.children(b), &[t]);
    }

    #[test]
    fn sibling_navigation() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let a = tree
            .append_element(root, "a", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        let x = tree.append_text(a, "x", &mut NullSink).unwrap();
        let b = tree
            .append_element(a, "b", ElementRole::Real, Vec::new(), &mut NullSink)
            .unwrap();
        assert_eq!(tree.first_child(a), Some(x));
        assert_eq!(tree.next_sibling(x), Some(b));
        assert_eq!(tree.previous_sibling(b), Some(x));
        assert_eq!(tree.previous_sibling(x), None);
        assert_eq!(tree.index_in_parent(b), Some(1));
        assert_eq!(tree.path_from_root(b), vec![root, a, b]);
        assert_eq!(tree.descendants(a), vec![a, x, b]);
    }
}
