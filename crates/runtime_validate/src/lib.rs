//! Host side of background validation.
//!
//! Everything runs on the caller's thread. A [`TimerQueue`] stands in for
//! the editor's timer facility and a [`ValidationSession`] ties one document
//! to its validator: edits go in through the session, their mutation
//! notifications are forwarded before the next slice, and due slices run
//! when the host advances the clock.

mod session;
mod timers;

pub use crate::session::{SessionError, ValidationSession};
pub use crate::timers::TimerQueue;
