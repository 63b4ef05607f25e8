use core_types::NodeKey;
use doctree::DocTree;

/// A problem found by a [`DocumentValidator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentIssue {
    pub node: NodeKey,
    pub message: String,
}

impl DocumentIssue {
    pub fn new(node: NodeKey, message: impl Into<String>) -> Self {
        Self {
            node,
            message: message.into(),
        }
    }
}

/// Whole-document check run once a pass reaches the end of the root, for
/// rules a grammar cannot express (unique ids, cross references, ...).
pub trait DocumentValidator {
    fn validate(&self, tree: &DocTree) -> Vec<DocumentIssue>;
}

impl<F> DocumentValidator for F
where
    F: Fn(&DocTree) -> Vec<DocumentIssue>,
{
    fn validate(&self, tree: &DocTree) -> Vec<DocumentIssue> {
        self(tree)
    }
}
