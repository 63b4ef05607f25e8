//! Grammar events and the walker contract consumed by the validator.
//!
//! A [`GrammarWalker`] consumes [`Event`]s one at a time in document order.
//! Walkers must be deterministic: firing the same event prefix against two
//! fresh walkers from the same [`Grammar`] yields indistinguishable states.

pub mod rules;

mod event;
mod walker;

pub use crate::event::{Event, EventDescriptor, EventSet};
pub use crate::rules::{GrammarLoadError, GrammarSpec, RuleGrammar, RuleWalker};
pub use crate::walker::{FireResult, Grammar, GrammarError, GrammarWalker};

pub use core_types::Name;
