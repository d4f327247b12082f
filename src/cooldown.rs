//! Per-user rate limit between questions.
//!
//! Users whose cooldown has passed are swept out at most once per cooldown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use docbot_core::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    pub allowed: bool,
    /// Whole seconds until the user may ask again; `0` when allowed.
    pub seconds_remaining: u64,
}

#[derive(Default)]
struct LastQuestions {
    by_user: HashMap<String, DateTime<Utc>>,
    last_sweep: Option<DateTime<Utc>>,
}

pub struct CooldownLimiter {
    last_question: Mutex<LastQuestions>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl CooldownLimiter {
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_question: Mutex::new(LastQuestions::default()),
            clock,
            cooldown,
        }
    }

    /// Whether `user_id` may ask now. Does not record anything.
    pub fn check_cooldown(&self, user_id: &str) -> CooldownCheck {
        let now = self.clock.now();
        let last = self.last_question.lock().unwrap_or_else(|e| e.into_inner());
        match last.by_user.get(user_id) {
            Some(at) if now - *at < self.cooldown => {
                let remaining = self.cooldown - (now - *at);
                CooldownCheck {
                    allowed: false,
                    seconds_remaining: remaining.num_seconds().max(0) as u64,
                }
            }
            _ => CooldownCheck {
                allowed: true,
                seconds_remaining: 0,
            },
        }
    }

    pub fn record_question(&self, user_id: &str) {
        let now = self.clock.now();
        let mut last = self.last_question.lock().unwrap_or_else(|e| e.into_inner());

        let due = last.last_sweep.map_or(true, |at| now - at >= self.cooldown);
        if due {
            let cooldown = self.cooldown;
            last.by_user.retain(|_, at| now - *at < cooldown);
            last.last_sweep = Some(now);
        }
        last.by_user.insert(user_id.to_string(), now);
    }

    pub fn reset(&self, user_id: &str) {
        self.last_question
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .by_user
            .remove(user_id);
    }

    /// Number of users currently remembered.
    pub fn tracked(&self) -> usize {
        self.last_question
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .by_user
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbot_core::clock::ManualClock;

    #[test]
    fn test_deny_then_allow() {
        let clock = Arc::new(ManualClock::default());
        let limiter = CooldownLimiter::new(Duration::seconds(15), clock.clone());

        assert!(limiter.check_cooldown("u1").allowed);
        limiter.record_question("u1");

        clock.advance_secs(5);
        let check = limiter.check_cooldown("u1");
        assert!(!check.allowed);
        assert_eq!(check.seconds_remaining, 10);
        assert!(limiter.check_cooldown("u2").allowed);

        clock.advance_secs(10);
        assert!(limiter.check_cooldown("u1").allowed);
    }

    #[test]
    fn test_remaining_rounds_down() {
        let clock = Arc::new(ManualClock::default());
        let limiter = CooldownLimiter::new(Duration::seconds(15), clock.clone());
        limiter.record_question("u1");
        clock.advance(Duration::milliseconds(500));
        assert_eq!(limiter.check_cooldown("u1").seconds_remaining, 14);
    }

    #[test]
    fn test_check_does_not_record() {
        let clock = Arc::new(ManualClock::default());
        let limiter = CooldownLimiter::new(Duration::seconds(15), clock.clone());
        limiter.record_question("u1");
        clock.advance_secs(5);
        limiter.check_cooldown("u1");
        clock.advance_secs(10);
        assert!(limiter.check_cooldown("u1").allowed);
    }

    #[test]
    fn test_reset() {
        let limiter = CooldownLimiter::new(Duration::seconds(15), Arc::new(ManualClock::default()));
        limiter.record_question("u1");
        limiter.reset("u1");
        assert!(limiter.check_cooldown("u1").allowed);
    }

    #[test]
    fn test_expired_users_are_swept() {
        let clock = Arc::new(ManualClock::default());
        let limiter = CooldownLimiter::new(Duration::seconds(15), clock.clone());
        for i in 0..50 {
            limiter.record_question(&format!("u{}", i));
        }
        assert_eq!(limiter.tracked(), 50);

        clock.advance_secs(15);
        limiter.record_question("late");
        assert_eq!(limiter.tracked(), 1);
        assert!(!limiter.check_cooldown("late").allowed);
        assert!(limiter.check_cooldown("u0").allowed);
    }
}
