use std::sync::Arc;

/// Prefix reserved for editor bookkeeping attributes.
pub(crate) const BOOKKEEPING_PREFIX: char = '_';

/// How an element takes part in the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementRole {
    /// Actual document data.
    #[default]
    Real,
    /// Presentational wrapper: its children are document data, the wrapper is not.
    Wrapper,
    /// Stand-in for missing content; contributes nothing.
    Placeholder,
    /// Display-only decoration; contributes nothing.
    Decoration,
}

impl ElementRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "real" => Some(Self::Real),
            "wrapper" => Some(Self::Wrapper),
            "placeholder" => Some(Self::Placeholder),
            "decoration" => Some(Self::Decoration),
            _ => None,
        }
    }
}

/// Closed classification of a node, resolved once when the node is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Root,
    Element,
    Text,
    Wrapper,
    Placeholder,
    Decoration,
}

impl NodeClass {
    pub(crate) fn of(kind: &NodeKind) -> Self {
        match kind {
            NodeKind::Root => Self::Root,
            NodeKind::Text(_) => Self::Text,
            NodeKind::Element(data) => match data.role {
                ElementRole::Real => Self::Element,
                ElementRole::Wrapper => Self::Wrapper,
                ElementRole::Placeholder => Self::Placeholder,
                ElementRole::Decoration => Self::Decoration,
            },
        }
    }

    /// Whether validation descends into nodes of this class.
    pub fn is_walked(self) -> bool {
        matches!(self, Self::Element | Self::Wrapper)
    }

    /// Whether nodes of this class produce tag events of their own.
    pub fn emits_tags(self) -> bool {
        matches!(self, Self::Element)
    }

    pub fn can_have_children(self) -> bool {
        !matches!(self, Self::Text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: Arc<str>,
    pub value: String,
}

/// What an attribute encodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeClass<'a> {
    /// Real document data, validated against the grammar.
    Data,
    /// `xmlns` (prefix `None`) or `xmlns:prefix`.
    NamespaceDeclaration { prefix: Option<&'a str> },
    /// Editor-internal data, never validated.
    Bookkeeping,
}

impl Attribute {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name),
            value: value.into(),
        }
    }

    pub fn class(&self) -> AttributeClass<'_> {
        let name: &str = &self.name;
        if name == "xmlns" {
            return AttributeClass::NamespaceDeclaration { prefix: None };
        }
        if let Some(prefix) = name.strip_prefix("xmlns:") {
            return AttributeClass::NamespaceDeclaration {
                prefix: Some(prefix),
            };
        }
        if name.starts_with(BOOKKEEPING_PREFIX) {
            return AttributeClass::Bookkeeping;
        }
        AttributeClass::Data
    }

    pub fn is_data(&self) -> bool {
        self.class() == AttributeClass::Data
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    /// Possibly prefixed (`p:local`) element name.
    pub name: Arc<str>,
    pub role: ElementRole,
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| &*attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Attributes that carry document data, in document order.
    pub fn data_attributes(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.attributes.iter().filter(|attr| attr.is_data())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(ElementData),
    Text(String),
}
