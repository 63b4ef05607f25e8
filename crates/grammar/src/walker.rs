use crate::event::{Event, EventSet};
use core_types::Name;
use std::collections::BTreeSet;

/// Why a walker rejected an event.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("element {name} not allowed here")]
    ElementNotAllowed { name: Name },
    #[error("unexpected end tag {name}")]
    UnexpectedEndTag { name: Name },
    #[error("attribute {attribute} not allowed on {element}")]
    AttributeNotAllowed { element: Name, attribute: Name },
    #[error("invalid value {value:?} for attribute {attribute}")]
    InvalidAttributeValue { attribute: Name, value: String },
    #[error("attribute {attribute} missing on {element}")]
    MissingAttribute { element: Name, attribute: Name },
    #[error("tag required in {parent}: {element}")]
    MissingElement { parent: Name, element: Name },
    #[error("text not allowed {}", location(.parent))]
    TextNotAllowed { parent: Option<Name> },
    #[error("document has no root element")]
    MissingRoot,
    #[error("element {name} is not closed")]
    UnclosedElement { name: Name },
    #[error("unexpected event: {event}")]
    UnexpectedEvent { event: String },
}

fn location(parent: &Option<Name>) -> String {
    match parent {
        Some(name) => format!("in {name}"),
        None => "outside the root element".to_string(),
    }
}

/// `Ok(())` when the walker accepted the event; otherwise the non-empty list
/// of problems it found. Walkers keep going after an error.
pub type FireResult = Result<(), Vec<GrammarError>>;

/// A stateful schema-conformance checker.
pub trait GrammarWalker: Clone {
    /// Advances by one event. On error the walker recovers in a best-effort
    /// way so later events can still be checked.
    fn fire_event(&mut self, event: &Event) -> FireResult;

    /// Events that would be accepted now. Never mutates state.
    fn possible(&self) -> EventSet;

    /// Checks that the input may end here.
    fn end(&mut self) -> FireResult;
}

/// Factory for fresh walkers.
pub trait Grammar {
    type Walker: GrammarWalker;

    fn new_walker(&self) -> Self::Walker;

    /// Namespaces the grammar knows about.
    fn namespaces(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}
