//! Namespace prefix resolution with per-element scoping.

use crate::node::{Attribute, AttributeClass, NodeClass};
use crate::tree::DocTree;
use core_types::{Name, NodeKey};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("prefix `{prefix}` is not bound to a namespace")]
pub struct UnboundPrefix {
    pub prefix: String,
}

#[derive(Clone, Debug, Default)]
struct Scope {
    default: Option<Arc<str>>,
    prefixes: Vec<(Arc<str>, Arc<str>)>,
}

/// Stack of namespace scopes, one per open element.
#[derive(Clone, Debug)]
pub struct NameResolver {
    scopes: Vec<Scope>,
}

impl NameResolver {
    pub fn new() -> Self {
        let mut base = Scope::default();
        base.prefixes
            .push((Arc::from("xml"), Arc::from(XML_NAMESPACE)));
        Self { scopes: vec![base] }
    }

    /// Resolver holding the bindings in effect inside `node`.
    pub fn for_ancestors(tree: &DocTree, node: NodeKey) -> Self {
        let mut resolver = Self::new();
        for key in tree.path_from_root(node) {
            if tree.class(key) != Some(NodeClass::Element) {
                continue;
            }
            resolver.enter_context();
            if let Some(data) = tree.element(key) {
                resolver.apply_declarations(&data.attributes);
            }
        }
        resolver
    }

    pub fn enter_context(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pops the innermost scope. The base scope is never popped.
    pub fn leave_context(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Binds `prefix` (`""` for the default namespace) in the innermost scope.
    pub fn define_prefix(&mut self, prefix: &str, uri: &str) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if prefix.is_empty() {
            scope.default = Some(Arc::from(uri));
        } else {
            scope.prefixes.push((Arc::from(prefix), Arc::from(uri)));
        }
    }

    /// Applies every namespace declaration found in `attributes`.
    pub fn apply_declarations(&mut self, attributes: &[Attribute]) {
        for attr in attributes {
            if let AttributeClass::NamespaceDeclaration { prefix } = attr.class() {
                self.define_prefix(prefix.unwrap_or(""), &attr.value);
            }
        }
    }

    pub fn resolve_element(&self, qname: &str) -> Result<Name, UnboundPrefix> {
        match qname.split_once(':') {
            Some((prefix, local)) => Ok(Name::new(&self.lookup(prefix)?, local)),
            None => {
                let ns = self
                    .scopes
                    .iter()
                    .rev()
                    .find_map(|scope| scope.default.clone());
                Ok(Name::new(ns.as_deref().unwrap_or(""), qname))
            }
        }
    }

    /// Unprefixed attributes are in no namespace.
    pub fn resolve_attribute(&self, qname: &str) -> Result<Name, UnboundPrefix> {
        match qname.split_once(':') {
            Some((prefix, local)) => Ok(Name::new(&self.lookup(prefix)?, local)),
            None => Ok(Name::local(qname)),
        }
    }

    fn lookup(&self, prefix: &str) -> Result<Arc<str>, UnboundPrefix> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| {
                scope
                    .prefixes
                    .iter()
                    .rev()
                    .find(|(p, _)| &**p == prefix)
                    .map(|(_, uri)| Arc::clone(uri))
            })
            .ok_or_else(|| UnboundPrefix {
                prefix: prefix.to_string(),
            })
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Every prefix declared in the document, with the URIs it is bound to in
/// order of first appearance. The default namespace is listed under `""`.
///
/// Prefixes map to lists because a prefix may be rebound in a subtree.
pub fn document_namespaces(tree: &DocTree) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in tree.descendants(tree.root()) {
        let Some(data) = tree.element(key) else {
            continue;
        };
        for attr in &data.attributes {
            if let AttributeClass::NamespaceDeclaration { prefix } = attr.class() {
                let uris = out.entry(prefix.unwrap_or("").to_string()).or_default();
                if !uris.contains(&attr.value) {
                    uris.push(attr.value.clone());
                }
            }
        }
    }
    out
}
