//! Escalation counter for questions repeated in the same channel.
//!
//! Each `(channel, topic)` pair counts how often its duplicate has been
//! asked recently. The count picks the reply tier; a pair that stays quiet
//! for longer than the reset window starts over at 1. Expired pairs are
//! swept out at most once per window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use docbot_core::clock::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepeatKey {
    pub channel_id: String,
    pub topic: String,
}

impl RepeatKey {
    pub fn new(channel_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            topic: topic.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u32,
    last_seen: DateTime<Utc>,
}

#[derive(Default)]
struct Counters {
    by_key: HashMap<RepeatKey, Counter>,
    last_sweep: Option<DateTime<Utc>>,
}

pub struct RepeatTracker {
    counters: Mutex<Counters>,
    clock: Arc<dyn Clock>,
    reset_window: Duration,
}

impl RepeatTracker {
    pub fn new(reset_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            clock,
            reset_window,
        }
    }

    /// Count this occurrence and return the new count (1 on first sight).
    pub fn get_repeat_count(&self, key: &RepeatKey) -> u32 {
        let now = self.clock.now();
        let mut guard = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let counters = &mut *guard;

        let due = counters
            .last_sweep
            .map_or(true, |at| now - at >= self.reset_window);
        if due {
            let window = self.reset_window;
            counters.by_key.retain(|_, c| now - c.last_seen <= window);
            counters.last_sweep = Some(now);
        }

        let counter = counters.by_key.entry(key.clone()).or_insert(Counter {
            count: 0,
            last_seen: now,
        });
        if now - counter.last_seen > self.reset_window {
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);
        counter.last_seen = now;
        counter.count
    }

    /// Forget one key, or every key when `None`.
    pub fn reset(&self, key: Option<&RepeatKey>) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        match key {
            Some(k) => {
                counters.by_key.remove(k);
            }
            None => counters.by_key.clear(),
        }
    }

    /// Number of `(channel, topic)` pairs currently tracked.
    pub fn tracked(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .by_key
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_core::clock::ManualClock;

    #[test]
    fn test_counts_escalate() {
        let clock = Arc::new(ManualClock::default());
        let tracker = RepeatTracker::new(Duration::seconds(600), clock.clone());
        let key = RepeatKey::new("general", "staking");

        assert_eq!(tracker.get_repeat_count(&key), 1);
        clock.advance_secs(30);
        assert_eq!(tracker.get_repeat_count(&key), 2);
        assert_eq!(tracker.get_repeat_count(&key), 3);

        let other = RepeatKey::new("random", "staking");
        assert_eq!(tracker.get_repeat_count(&other), 1);
    }

    #[test]
    fn test_resets_after_window() {
        let clock = Arc::new(ManualClock::default());
        let tracker = RepeatTracker::new(Duration::seconds(600), clock.clone());
        let key = RepeatKey::new("general", "staking");

        tracker.get_repeat_count(&key);
        tracker.get_repeat_count(&key);
        clock.advance_secs(600);
        assert_eq!(tracker.get_repeat_count(&key), 3);
        clock.advance_secs(601);
        assert_eq!(tracker.get_repeat_count(&key), 1);
    }

    #[test]
    fn test_reset_key() {
        let tracker = RepeatTracker::new(Duration::seconds(600), Arc::new(ManualClock::default()));
        let key = RepeatKey::new("general", "staking");
        tracker.get_repeat_count(&key);
        tracker.reset(Some(&key));
        assert_eq!(tracker.get_repeat_count(&key), 1);
        tracker.reset(None);
        assert_eq!(tracker.get_repeat_count(&key), 1);
    }

    #[test]
    fn test_expired_pairs_are_swept() {
        let clock = Arc::new(ManualClock::default());
        let tracker = RepeatTracker::new(Duration::seconds(600), clock.clone());
        for i in 0..100 {
            tracker.get_repeat_count(&RepeatKey::new(format!("c{}", i), "staking"));
        }
        assert_eq!(tracker.tracked(), 100);

        clock.advance_secs(601);
        let key = RepeatKey::new("general", "fees");
        assert_eq!(tracker.get_repeat_count(&key), 1);
        assert_eq!(tracker.tracked(), 1);
        assert_eq!(tracker.get_repeat_count(&key), 2);
    }
}
