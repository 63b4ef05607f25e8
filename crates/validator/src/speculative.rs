use crate::error::{ValidationError, ValidatorError};
use crate::projector::Pass;
use crate::query::Position;
use crate::scheduler::TaskScheduler;
use crate::validator::Validator;
use core_types::NodeKey;
use doctree::{DocTree, NameResolver, NodeClass};
use grammar::Grammar;

impl<G: Grammar, S: TaskScheduler> Validator<G, S> {
    /// Checks `nodes` of `fragment` as if they were inserted at `position` of
    /// `tree`. Returns `Ok(None)` when they fit.
    ///
    /// The fragment is not a complete document, so unclosed or missing
    /// content at its end is not reported. The live pass is only moved
    /// forward as far as needed to reach `position`.
    pub fn speculatively_validate(
        &mut self,
        tree: &DocTree,
        position: Position,
        fragment: &DocTree,
        nodes: &[NodeKey],
    ) -> Result<Option<Vec<ValidationError>>, ValidatorError> {
        let walker = self.walker_at(tree, position)?;
        let scope = match tree.class(position.container) {
            Some(NodeClass::Text) => tree.parent(position.container).ok_or(
                ValidatorError::DetachedCursor {
                    node: position.container,
                },
            )?,
            _ => position.container,
        };
        let mut pass = Pass::detached(walker, NameResolver::for_ancestors(tree, scope));
        for &node in nodes {
            pass.project_subtree(fragment, node)?;
        }
        log::debug!(
            target: "validator.query",
            "speculative check of {} nodes at {position:?}: {} errors",
            nodes.len(),
            pass.errors.len()
        );
        Ok((!pass.errors.is_empty()).then_some(pass.errors))
    }
}
