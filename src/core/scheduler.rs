//! Cooperative timer queue on a virtual millisecond clock.
//!
//! Every timer records the generation it was scheduled in. Bumping the
//! generation purges all non-persistent timers at once, and any stale
//! entry that survives is dropped when it comes due instead of firing.

use std::cell::Cell;
use std::rc::Rc;

/// Shared virtual time in milliseconds.
///
/// Cloning yields another handle to the same clock, so audio simulations
/// and the scheduler agree on "now".
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now_ms: Rc<Cell<u64>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    /// Move time forward. Time never runs backwards.
    pub fn advance_to(&self, ms: u64) {
        if ms > self.now_ms.get() {
            self.now_ms.set(ms);
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    /// Scheduling order, used to break ties between equal due times.
    seq: u64,
    due_ms: u64,
    generation: u64,
    persistent: bool,
    task: T,
}

/// A timer that came due.
#[derive(Debug, PartialEq)]
pub struct Fired<T> {
    pub due_ms: u64,
    pub task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    clock: Clock,
    entries: Vec<Entry<T>>,
    next_seq: u64,
    generation: u64,
}

impl<T> Scheduler<T> {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            entries: Vec::new(),
            next_seq: 0,
            generation: 0,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Schedule a task tied to the current generation.
    pub fn schedule(&mut self, delay_ms: u64, task: T) {
        self.push(delay_ms, task, false)
    }

    /// Schedule a task that survives generation bumps.
    pub fn schedule_persistent(&mut self, delay_ms: u64, task: T) {
        self.push(delay_ms, task, true)
    }

    fn push(&mut self, delay_ms: u64, task: T, persistent: bool) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            seq,
            due_ms: self.clock.now_ms().saturating_add(delay_ms),
            generation: self.generation,
            persistent,
            task,
        });
    }

    /// Remove every pending task matching `pred`. Returns how many went.
    pub fn cancel_where(&mut self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.task));
        before - self.entries.len()
    }

    /// Start a new generation and discard every non-persistent timer.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.entries.retain(|e| e.persistent);
        self.generation
    }

    pub fn pending_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.task)).count()
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.due_ms).min()
    }

    /// Remove and return the earliest timer due at or before `until_ms`,
    /// moving the clock to its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired<T>> {
        loop {
            let idx = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.due_ms <= until_ms)
                .min_by_key(|(_, e)| (e.due_ms, e.seq))
                .map(|(idx, _)| idx)?;
            let entry = self.entries.remove(idx);
            self.clock.advance_to(entry.due_ms);
            if entry.persistent || entry.generation == self.generation {
                return Some(Fired {
                    due_ms: entry.due_ms,
                    task: entry.task,
                });
            }
            log::trace!("dropping stale timer from generation {}", entry.generation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Job {
        A,
        B,
        Blink,
    }

    #[test]
    fn fires_in_due_order_then_fifo() {
        let mut sched = Scheduler::new(Clock::new());
        sched.schedule(30, Job::A);
        sched.schedule(10, Job::B);
        sched.schedule(30, Job::Blink);

        assert_eq!(sched.next_due(), Some(10));
        assert_eq!(sched.pop_due(100).unwrap().task, Job::B);
        assert_eq!(sched.now_ms(), 10);
        assert_eq!(sched.pop_due(100).unwrap().task, Job::A);
        assert_eq!(sched.pop_due(100).unwrap().task, Job::Blink);
        assert_eq!(sched.now_ms(), 30);
        assert!(sched.pop_due(100).is_none());
    }

    #[test]
    fn nothing_fires_before_due() {
        let mut sched = Scheduler::new(Clock::new());
        sched.schedule(50, Job::A);
        assert!(sched.pop_due(49).is_none());
        assert_eq!(sched.next_due(), Some(50));
        assert_eq!(sched.now_ms(), 0);
    }

    #[test]
    fn bump_generation_purges_all_but_persistent() {
        let mut sched = Scheduler::new(Clock::new());
        sched.schedule(10, Job::A);
        sched.schedule(20, Job::B);
        sched.schedule_persistent(500, Job::Blink);

        assert_eq!(sched.bump_generation(), 1);
        assert_eq!(sched.pending_where(|_| true), 1);
        assert_eq!(sched.pop_due(1000).unwrap().task, Job::Blink);
        assert!(sched.pop_due(1000).is_none());
    }

    #[test]
    fn cancel_by_predicate() {
        let mut sched = Scheduler::new(Clock::new());
        sched.schedule(10, Job::A);
        sched.schedule(10, Job::B);
        sched.schedule(20, Job::B);

        assert_eq!(sched.cancel_where(|j| *j == Job::B), 2);
        assert_eq!(sched.cancel_where(|j| *j == Job::B), 0);
        assert_eq!(sched.pending_where(|j| *j == Job::A), 1);
    }

    #[test]
    fn delays_are_relative_to_now() {
        let clock = Clock::new();
        let mut sched = Scheduler::new(clock.clone());
        clock.advance_to(1_000);
        sched.schedule(15, Job::A);
        assert_eq!(sched.next_due(), Some(1_015));
        let fired = sched.pop_due(2_000).unwrap();
        assert_eq!(fired.due_ms, 1_015);
        assert_eq!(clock.now_ms(), 1_015);
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = Clock::new();
        clock.advance_to(10);
        clock.advance_to(5);
        assert_eq!(clock.now_ms(), 10);
    }
}
