//! Incremental, resumable schema validation of a live document tree.
//!
//! A [`Validator`] walks the tree in small cycles, turning it into grammar
//! events, and records checkpoints of the event log at the start and end of
//! every element it visits. The checkpoints serve two purposes:
//!
//! - edits only throw away the state recorded after the edit point, and
//! - position queries replay the log from the nearest checkpoint instead of
//!   from the top of the document.

mod checkpoint;
mod config;
mod document;
mod error;
mod notify;
mod projector;
mod query;
mod scheduler;
mod speculative;
mod validator;

pub use crate::checkpoint::{Checkpoint, CheckpointKind};
pub use crate::config::{ConfigError, ValidatorConfig};
pub use crate::document::{DocumentIssue, DocumentValidator};
pub use crate::error::{ValidationError, ValidatorError, Violation};
pub use crate::notify::{ValidatorNotification, WorkingState, WorkingStatus};
pub use crate::query::Position;
pub use crate::scheduler::{ManualScheduler, ResumeTicket, TaskScheduler};
pub use crate::validator::Validator;
