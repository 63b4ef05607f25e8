//! Live document tree for the editor.
//!
//! The tree is an arena keyed by [`NodeKey`]. Mutations go through
//! [`TreeEdit`] operations and every change to the attached document is
//! reported synchronously to a [`MutationSink`] as a [`TreeMutation`].

pub mod markup;
pub mod namespaces;
pub mod outline;

mod edit;
mod node;
mod tree;

pub use crate::edit::{MutationSink, NullSink, TreeEdit, TreeMutation};
pub use crate::markup::{MarkupError, parse_markup};
pub use crate::namespaces::{NameResolver, UnboundPrefix, XML_NAMESPACE, document_namespaces};
pub use crate::node::{Attribute, AttributeClass, ElementData, ElementRole, NodeClass, NodeKind};
pub use crate::tree::{DocTree, TreeError};

pub use core_types::{Name, NodeKey};
