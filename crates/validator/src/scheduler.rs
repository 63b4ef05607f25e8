//! Cooperative time slicing.
//!
//! The validator never sleeps or spawns. It asks a [`TaskScheduler`] to hand
//! a [`ResumeTicket`] back after some delay, and the host calls
//! [`crate::Validator::resume`] with it. A ticket is only honored if it is
//! the one most recently issued; tickets from a stopped or restarted pass
//! are ignored.

use std::collections::VecDeque;
use std::time::Duration;

/// Handle for one scheduled slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResumeTicket {
    /// Bumped by every start, stop and restart.
    pub epoch: u64,
    pub slice: u64,
}

/// Injected timer capability.
pub trait TaskScheduler {
    fn schedule(&mut self, delay: Duration, ticket: ResumeTicket);
    fn cancel(&mut self, ticket: ResumeTicket);
}

/// Scheduler that just queues tickets for the host to pop, ignoring delays.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    queue: VecDeque<(Duration, ResumeTicket)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<ResumeTicket> {
        self.queue.pop_front().map(|(_, ticket)| ticket)
    }

    /// Delay requested for the next queued ticket.
    pub fn next_delay(&self) -> Option<Duration> {
        self.queue.front().map(|(delay, _)| *delay)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, ticket: ResumeTicket) {
        self.queue.push_back((delay, ticket));
    }

    fn cancel(&mut self, ticket: ResumeTicket) {
        self.queue.retain(|(_, queued)| *queued != ticket);
    }
}
