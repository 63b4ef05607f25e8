use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use validator::{ResumeTicket, TaskScheduler};

#[derive(Debug, Default)]
struct Timers {
    now: Duration,
    next_seq: u64,
    /// Keyed by deadline, then by scheduling order.
    due: BTreeMap<(Duration, u64), ResumeTicket>,
}

/// Timer queue on a virtual clock. Clones share the same queue, so the
/// validator can own one handle while the host drives another.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    inner: Rc<RefCell<Timers>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().due.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner.borrow().due.keys().next().map(|(at, _)| *at)
    }

    /// Removes the earliest ticket due at or before `until` and moves the
    /// clock to its deadline.
    pub fn pop_due(&self, until: Duration) -> Option<ResumeTicket> {
        let mut timers = self.inner.borrow_mut();
        let (&(at, seq), _) = timers.due.iter().next()?;
        if at > until {
            return None;
        }
        let ticket = timers.due.remove(&(at, seq))?;
        timers.now = timers.now.max(at);
        Some(ticket)
    }

    /// Moves the clock forward to `at`. The clock never goes back.
    pub fn advance_to(&self, at: Duration) {
        let mut timers = self.inner.borrow_mut();
        timers.now = timers.now.max(at);
    }
}

impl TaskScheduler for TimerQueue {
    fn schedule(&mut self, delay: Duration, ticket: ResumeTicket) {
        let mut timers = self.inner.borrow_mut();
        let at = timers.now + delay;
        let seq = timers.next_seq;
        timers.next_seq += 1;
        timers.due.insert((at, seq), ticket);
    }

    fn cancel(&mut self, ticket: ResumeTicket) {
        self.inner
            .borrow_mut()
            .due
            .retain(|_, queued| *queued != ticket);
    }
}
