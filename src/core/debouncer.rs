//! Debouncer - commits a text-field edit only once typing settles.
//!
//! Every keystroke calls `schedule()`, which replaces the pending value and
//! restarts the timer. The caller polls `tick()` from its loop and commits
//! whatever it returns.
//!
//! ```ignore
//! // on every keystroke
//! debouncer.schedule(form.clone());
//!
//! // in the update loop
//! if let Some(settled) = debouncer.tick() {
//!     session.commit_form(settled);
//! }
//! ```

use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: None,
        }
    }

    pub fn set_delay(&mut self, delay_ms: u64) {
        self.delay = Duration::from_millis(delay_ms);
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Replace the pending value and restart the timer.
    pub fn schedule(&mut self, value: T) {
        self.schedule_at(value, Instant::now());
    }

    pub fn schedule_at(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
        log::trace!("Debouncer: rescheduled, fires in {}ms", self.delay.as_millis());
    }

    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            log::trace!("Debouncer: cancelled pending value");
        }
    }

    /// Settled value, if the delay has elapsed. Clears the pending state.
    pub fn tick(&mut self) -> Option<T> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    /// Fire immediately regardless of the timer (e.g. focus lost, save).
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_no_trigger() {
        let mut d = Debouncer::new(100);
        d.schedule("a");
        assert!(d.is_pending());
        assert!(d.tick().is_none());
    }

    #[test]
    fn test_trigger_after_delay() {
        let mut d = Debouncer::new(500);
        let t0 = Instant::now();
        d.schedule_at(42, t0);
        assert_eq!(d.tick_at(t0 + Duration::from_millis(499)), None);
        assert_eq!(d.tick_at(t0 + Duration::from_millis(500)), Some(42));
        assert!(!d.is_pending());
    }

    #[test]
    fn test_reschedule_restarts_timer_and_keeps_last_value() {
        let mut d = Debouncer::new(500);
        let t0 = Instant::now();
        d.schedule_at("gr", t0);
        d.schedule_at("gra", t0 + Duration::from_millis(300));
        assert_eq!(d.tick_at(t0 + Duration::from_millis(600)), None);
        assert_eq!(d.pending(), Some(&"gra"));
        assert_eq!(d.tick_at(t0 + Duration::from_millis(800)), Some("gra"));
    }

    #[test]
    fn test_cancel_and_flush() {
        let mut d = Debouncer::new(500);
        d.schedule(1);
        d.cancel();
        assert!(d.tick_at(Instant::now() + Duration::from_secs(1)).is_none());

        d.schedule(2);
        assert_eq!(d.flush(), Some(2));
        assert!(!d.is_pending());
    }
}
