//! Time-driven callbacks: the scroll clock and per-glyph fade timers.
//!
//! Everything runs on the host's event thread. Instead of storing closures, timers carry a
//! [`TimerTarget`] that the engine dispatches when the host reports the deadline has passed.
//! Time is always passed in, so the same code runs under a real clock and in tests.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use crate::queue::GlyphId;

/// Cancellable reference to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a ticker timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTarget {
    /// Advance the scroll window by the current step.
    Scroll,
    /// Move a content glyph one fade level closer to expiry.
    Fade(GlyphId),
}

/// Deadline-ordered timers with O(1) cancellation.
///
/// Cancelled entries stay in the heap until they reach the front, but they are never returned by
/// [`TimerQueue::pop_due`] or reported by [`TimerQueue::next_deadline`].
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    pending: HashMap<u64, T>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule_at(&mut self, deadline: Instant, target: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.pending.insert(id, target);
        TimerHandle(id)
    }

    pub fn schedule(&mut self, now: Instant, after: Duration, target: T) -> TimerHandle {
        self.schedule_at(now + after, target)
    }

    /// Cancels a timer, returning its target if it had not fired yet.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        self.pending.remove(&handle.0)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn discard_cancelled_head(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.pending.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }

    /// Earliest live deadline, if any.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_cancelled_head();
        self.heap.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Removes and returns the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, T)> {
        self.discard_cancelled_head();
        let Reverse((deadline, id)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.heap.pop();
        let target = self.pending.remove(&id)?;
        Some((TimerHandle(id), target))
    }
}

/// The per-engine scroll clock.
///
/// Running means a [`TimerTarget::Scroll`] is pending; each tick re-arms it.
#[derive(Debug, Default)]
pub(crate) struct AnimationClock {
    handle: Option<TimerHandle>,
}

impl AnimationClock {
    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn start(
        &mut self,
        timers: &mut TimerQueue<TimerTarget>,
        now: Instant,
        interval: Duration,
    ) {
        if self.handle.is_none() {
            self.handle = Some(timers.schedule(now, interval, TimerTarget::Scroll));
        }
    }

    pub(crate) fn stop(&mut self, timers: &mut TimerQueue<TimerTarget>) {
        if let Some(handle) = self.handle.take() {
            timers.cancel(handle);
        }
    }

    /// Forgets a handle that has already fired without scheduling another tick.
    pub(crate) fn fired(&mut self, handle: TimerHandle) -> bool {
        if self.handle == Some(handle) {
            self.handle = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pops_in_deadline_order_only_when_due() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(start, Duration::from_millis(30), "late");
        timers.schedule(start, Duration::from_millis(10), "early");

        assert_eq!(timers.pop_due(start), None);
        assert_eq!(
            timers.next_deadline(),
            Some(start + Duration::from_millis(10))
        );

        let now = start + Duration::from_millis(40);
        assert_eq!(timers.pop_due(now).map(|(_, target)| target), Some("early"));
        assert_eq!(timers.pop_due(now).map(|(_, target)| target), Some("late"));
        assert_eq!(timers.pop_due(now), None);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let first = timers.schedule(start, Duration::from_millis(10), 1);
        timers.schedule(start, Duration::from_millis(20), 2);

        assert_eq!(timers.cancel(first), Some(1));
        assert_eq!(timers.cancel(first), None);
        assert!(!timers.is_pending(first));
        assert_eq!(
            timers.next_deadline(),
            Some(start + Duration::from_millis(20))
        );

        let now = start + Duration::from_secs(1);
        assert_eq!(timers.pop_due(now).map(|(_, target)| target), Some(2));
        assert_eq!(timers.pop_due(now), None);
    }

    #[test]
    fn clock_start_is_idempotent_and_stop_cancels() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        let mut clock = AnimationClock::default();

        clock.start(&mut timers, start, Duration::from_millis(50));
        clock.start(&mut timers, start, Duration::from_millis(50));
        assert!(clock.is_running());
        assert_eq!(timers.len(), 1);

        clock.stop(&mut timers);
        assert!(!clock.is_running());
        assert!(timers.is_empty());
    }
}
