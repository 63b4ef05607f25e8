//! Incremental, resumable schema validation for a structured document
//! editor.
//!
//! The pieces live in their own crates and are re-exported here:
//!
//! - [`doctree`]: the live document tree, its edit protocol and mutation
//!   notifications.
//! - [`grammar`]: grammar events, the walker contract and a rule grammar
//!   loaded from TOML.
//! - [`validator`]: the incremental validator with its checkpoints,
//!   position queries and time slicing.
//! - [`runtime_validate`]: a single-threaded session that drives a
//!   validator from a virtual timer queue.

pub use doctree;
pub use grammar;
pub use runtime_validate;
pub use validator;

pub use core_types::{EventIndex, Name, NodeKey};
pub use doctree::{DocTree, TreeEdit, TreeMutation, parse_markup};
pub use grammar::{Event, EventDescriptor, EventSet, Grammar, GrammarWalker, RuleGrammar};
pub use runtime_validate::{SessionError, TimerQueue, ValidationSession};
pub use validator::{
    Position, ValidationError, Validator, ValidatorConfig, ValidatorNotification, WorkingState,
    WorkingStatus,
};
