use core_types::{EventIndex, NodeKey};
use grammar::{Event, GrammarError};
use std::fmt;

/// Internal inconsistency between the document and the validator's cached
/// state. These are bugs, never schema problems.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    #[error("end of {node} reached without an after-start checkpoint")]
    MissingStartCheckpoint { node: NodeKey },
    #[error("walk position {node} is no longer part of the document")]
    DetachedCursor { node: NodeKey },
    #[error("checkpoint needed at {node} is missing or out of date")]
    StaleCheckpoint { node: NodeKey },
    #[error("node {node} is not in the document")]
    UnknownNode { node: NodeKey },
    #[error("node {node} cannot hold a position")]
    NotAContainer { node: NodeKey },
    #[error("offset {offset} is out of range for {node}")]
    OffsetOutOfRange { node: NodeKey, offset: usize },
}

/// What was wrong.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("{0}")]
    Grammar(#[from] GrammarError),
    #[error("cannot resolve prefix `{prefix}` in `{name}`")]
    UnresolvedPrefix { prefix: String, name: String },
    #[error("{0}")]
    Document(String),
}

/// A schema problem found by a pass, tied to the node it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub violation: Violation,
    /// The event that triggered the problem, when there was one.
    pub event: Option<Event>,
    pub node: NodeKey,
    /// Child index or character offset within `node`.
    pub offset: usize,
    /// Log index of `event`. Problems without an event carry the index
    /// the next event would get.
    pub event_index: EventIndex,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {}:{})", self.violation, self.node, self.offset)
    }
}

impl std::error::Error for ValidationError {}
