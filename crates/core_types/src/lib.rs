use std::fmt;
use std::sync::Arc;

/// Opaque key for stable node identity within one document tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Reserved sentinel for "unassigned/invalid" identity.
    pub const INVALID: NodeKey = NodeKey(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index into a validator's event log.
pub type EventIndex = usize;

/// A namespace-resolved name. The empty namespace means "no namespace".
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub ns: Arc<str>,
    pub local: Arc<str>,
}

impl Name {
    pub fn new(ns: &str, local: &str) -> Self {
        Self {
            ns: Arc::from(ns),
            local: Arc::from(local),
        }
    }

    /// A name in no namespace.
    pub fn local(local: &str) -> Self {
        Self::new("", local)
    }

    pub fn has_namespace(&self) -> bool {
        !self.ns.is_empty()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ns.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.ns, self.local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_display_uses_clark_notation_only_with_namespace() {
        assert_eq!(Name::local("p").to_string(), "p");
        assert_eq!(
            Name::new("http://www.tei-c.org/ns/1.0", "p").to_string(),
            "{http://www.tei-c.org/ns/1.0}p"
        );
    }

    #[test]
    fn invalid_key_is_not_valid() {
        assert!(!NodeKey::INVALID.is_valid());
        assert!(NodeKey(7).is_valid());
        assert_eq!(NodeKey(7).to_string(), "#7");
    }
}
