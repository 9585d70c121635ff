#![forbid(unsafe_code)]

//! Coalescing of bursty triggers into one scheduled run.
//!
//! A [`Coalescer`] does not own a timer. The caller asks it whether a trigger
//! should arm one (`trigger` returns the [`Schedule`] to request from the
//! host), and tells it when the armed run fires. Triggers arriving while a
//! run is armed are folded into it.
//!
//! `skip_next` swallows exactly one future trigger. The controller uses it so
//! the resize it dispatches itself does not feed back into its own handler.

use core::time::Duration;

/// When an armed run should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Next animation frame.
    NextFrame,
    /// After a fixed delay.
    After(Duration),
}

#[derive(Debug, Clone)]
pub struct Coalescer {
    schedule: Schedule,
    armed: bool,
    skip_next: bool,
}

impl Coalescer {
    #[must_use]
    pub const fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            armed: false,
            skip_next: false,
        }
    }

    #[must_use]
    pub const fn schedule(&self) -> Schedule {
        self.schedule
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Swallow the next trigger.
    pub fn skip_next(&mut self) {
        self.skip_next = true;
    }

    /// Register a trigger. Returns the schedule to arm, or `None` when the
    /// trigger was skipped or folded into an already armed run.
    pub fn trigger(&mut self) -> Option<Schedule> {
        if core::mem::take(&mut self.skip_next) {
            return None;
        }
        if self.armed {
            return None;
        }
        self.armed = true;
        Some(self.schedule)
    }

    /// The armed run fired. Returns `false` for a stale fire (nothing armed).
    pub fn fire(&mut self) -> bool {
        core::mem::take(&mut self.armed)
    }

    /// Forget any armed run and pending skip. Returns whether a run was armed,
    /// in which case the caller should cancel its host timer.
    pub fn reset(&mut self) -> bool {
        self.skip_next = false;
        core::mem::take(&mut self.armed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_folds_into_one_run() {
        let mut c = Coalescer::new(Schedule::NextFrame);
        assert_eq!(c.trigger(), Some(Schedule::NextFrame));
        assert_eq!(c.trigger(), None);
        assert_eq!(c.trigger(), None);
        assert!(c.fire());
        assert!(!c.fire());
        assert_eq!(c.trigger(), Some(Schedule::NextFrame));
    }

    #[test]
    fn skip_swallows_exactly_one_trigger() {
        let mut c = Coalescer::new(Schedule::After(Duration::from_millis(50)));
        c.skip_next();
        assert_eq!(c.trigger(), None);
        assert!(!c.is_armed());
        assert_eq!(c.trigger(), Some(Schedule::After(Duration::from_millis(50))));
    }

    #[test]
    fn reset_clears_armed_run_and_skip() {
        let mut c = Coalescer::new(Schedule::NextFrame);
        c.trigger();
        c.skip_next();
        assert!(c.reset());
        assert!(!c.reset());
        assert_eq!(c.trigger(), Some(Schedule::NextFrame));
    }
}
