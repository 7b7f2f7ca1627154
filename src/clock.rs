//! Deterministic virtual-time scheduler.
//!
//! Tasks are one-shot or repeating and identified by a [`TaskHandle`].
//! Due tasks are released strictly in time order; tasks due at the same
//! instant fire in the order they were scheduled.

use std::collections::BTreeMap;

/// Handle to a scheduled task, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Task<K> {
    kind: K,
    every_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct VirtualClock<K> {
    now_ms: u64,
    next_seq: u64,
    // (due time, sequence) -> handle
    queue: BTreeMap<(u64, u64), TaskHandle>,
    tasks: BTreeMap<TaskHandle, ((u64, u64), Task<K>)>,
}

impl<K: Clone> VirtualClock<K> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
            tasks: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Run `kind` once after `delay_ms`.
    pub fn schedule_once(&mut self, delay_ms: u64, kind: K) -> TaskHandle {
        self.insert(delay_ms, kind, None)
    }

    /// Run `kind` every `interval_ms`, first after one interval.
    ///
    /// A zero interval is treated as one millisecond.
    pub fn schedule_every(&mut self, interval_ms: u64, kind: K) -> TaskHandle {
        let interval_ms = interval_ms.max(1);
        self.insert(interval_ms, kind, Some(interval_ms))
    }

    /// Schedule a one-shot task at an absolute time (not earlier than now).
    pub fn schedule_at(&mut self, at_ms: u64, kind: K) -> TaskHandle {
        let delay = at_ms.saturating_sub(self.now_ms);
        self.insert(delay, kind, None)
    }

    /// Cancel a task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        match self.tasks.remove(&handle) {
            Some((key, _)) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Due time of the next task.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Release the next task due at or before `until_ms`, advancing the
    /// clock to its due time. Repeating tasks are re-armed before return.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TaskHandle, K)> {
        let (&key, &handle) = self.queue.iter().next()?;
        if key.0 > until_ms {
            return None;
        }
        self.queue.remove(&key);
        let (_, task) = self.tasks.remove(&handle)?;
        self.now_ms = key.0;

        let kind = task.kind.clone();
        if let Some(every) = task.every_ms {
            let next_key = (self.now_ms + every, self.bump_seq());
            self.queue.insert(next_key, handle);
            self.tasks.insert(handle, (next_key, task));
        }
        Some((handle, kind))
    }

    /// Move the clock forward without releasing tasks.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    fn insert(&mut self, delay_ms: u64, kind: K, every_ms: Option<u64>) -> TaskHandle {
        let seq = self.bump_seq();
        let handle = TaskHandle(seq);
        let key = (self.now_ms + delay_ms, seq);
        self.queue.insert(key, handle);
        self.tasks.insert(handle, (key, Task { kind, every_ms }));
        handle
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl<K: Clone> Default for VirtualClock<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut VirtualClock<&'static str>, until: u64) -> Vec<(u64, &'static str)> {
        let mut fired = Vec::new();
        while let Some((_, kind)) = clock.pop_due(until) {
            fired.push((clock.now(), kind));
        }
        clock.set_now(until);
        fired
    }

    #[test]
    fn test_once_fires_in_time_order() {
        let mut clock = VirtualClock::new();
        clock.schedule_once(300, "b");
        clock.schedule_once(100, "a");
        assert_eq!(drain(&mut clock, 1000), vec![(100, "a"), (300, "b")]);
        assert_eq!(clock.pending(), 0);
        assert_eq!(clock.now(), 1000);
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let mut clock = VirtualClock::new();
        clock.schedule_once(50, "first");
        clock.schedule_once(50, "second");
        assert_eq!(drain(&mut clock, 50), vec![(50, "first"), (50, "second")]);
    }

    #[test]
    fn test_every_rearms() {
        let mut clock = VirtualClock::new();
        let h = clock.schedule_every(80, "tick");
        assert_eq!(drain(&mut clock, 250).len(), 3);
        assert!(clock.is_pending(h));
        assert_eq!(clock.next_due(), Some(320));
        assert!(clock.cancel(h));
        assert!(drain(&mut clock, 1000).is_empty());
    }

    #[test]
    fn test_cancel_once() {
        let mut clock = VirtualClock::new();
        let h = clock.schedule_once(10, "x");
        assert!(clock.cancel(h));
        assert!(!clock.cancel(h));
        assert!(drain(&mut clock, 100).is_empty());
    }

    #[test]
    fn test_schedule_at_in_past_fires_now() {
        let mut clock = VirtualClock::new();
        clock.set_now(500);
        clock.schedule_at(100, "late");
        assert_eq!(drain(&mut clock, 500), vec![(500, "late")]);
    }
}
