//! Per-target timers.
//!
//! Timers are identified by the target they are set on plus a caller-chosen
//! number, and fire repeatedly at their interval until killed. Firing
//! produces [`codes::TIMER`] messages addressed to the target with the
//! timer number in `wparam`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};

use crate::event::{codes, Message, TargetId};

new_key_type! {
    /// Internal key of a scheduled timer.
    pub struct TimerKey;
}

#[derive(Debug)]
struct TimerData {
    target: TargetId,
    timer: u32,
    interval: Duration,
    next_fire: Instant,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    key: TimerKey,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Deadline-ordered queue of repeating target timers.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: SlotMap<TimerKey, TimerData>,
    by_owner: HashMap<(TargetId, u32), TimerKey>,
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) timer `timer` on `target`.
    pub fn start(&mut self, target: TargetId, timer: u32, interval: Duration, now: Instant) {
        self.stop(target, timer);
        let next_fire = now + interval;
        let key = self.timers.insert(TimerData {
            target,
            timer,
            interval,
            next_fire,
        });
        self.by_owner.insert((target, timer), key);
        self.queue.push(TimerQueueEntry {
            key,
            fire_time: next_fire,
        });
        tracing::trace!(target: "switchyard_core::timer", %target, timer, ?interval, "timer started");
    }

    /// Stop a timer. Returns `false` if it was not running.
    pub fn stop(&mut self, target: TargetId, timer: u32) -> bool {
        match self.by_owner.remove(&(target, timer)) {
            Some(key) => self.timers.remove(key).is_some(),
            None => false,
        }
    }

    /// Stop every timer set on `target`.
    pub fn stop_target(&mut self, target: TargetId) {
        let owned: Vec<u32> = self
            .by_owner
            .keys()
            .filter(|(t, _)| *t == target)
            .map(|(_, timer)| *timer)
            .collect();
        for timer in owned {
            self.stop(target, timer);
        }
    }

    /// Whether a timer is running.
    pub fn is_active(&self, target: TargetId, timer: u32) -> bool {
        self.by_owner.contains_key(&(target, timer))
    }

    /// Number of running timers.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Duration until the next timer fires, if any.
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.key) {
                break;
            }
            self.queue.pop();
        }
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Collect `TIMER` messages for every timer due at `now`.
    ///
    /// Each due timer fires once per call and is rescheduled one interval
    /// after `now`.
    pub fn process_expired(&mut self, now: Instant) -> Vec<Message> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();
            // Stale entries belong to stopped or restarted timers.
            let Some(timer) = self.timers.get(entry.key) else {
                continue;
            };
            if timer.next_fire != entry.fire_time {
                continue;
            }
            due.push(entry.key);
        }

        let mut fired = Vec::with_capacity(due.len());
        for key in due {
            let Some(timer) = self.timers.get_mut(key) else {
                continue;
            };
            tracing::trace!(target: "switchyard_core::timer", target_id = %timer.target, timer = timer.timer, "timer fired");
            fired.push(
                Message::new(codes::TIMER)
                    .to(timer.target)
                    .with_params(timer.timer as usize, 0),
            );
            timer.next_fire = now + timer.interval.max(Duration::from_millis(1));
            self.queue.push(TimerQueueEntry {
                key,
                fire_time: timer.next_fire,
            });
        }
        fired
    }
}
