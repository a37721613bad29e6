// Fixed-interval poll gate for sensor sampling loops
//
// The caller owns the clock and passes a wrapping millisecond timestamp;
// nothing here sleeps. stop() is the only way to cancel sampling.

use core::fmt;

pub const MIN_INTERVAL_MS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    interval_ms: u32,
    next_due_ms: u32,
    running: bool,
}

impl PollSchedule {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: if interval_ms < MIN_INTERVAL_MS {
                MIN_INTERVAL_MS
            } else {
                interval_ms
            },
            next_due_ms: 0,
            running: false,
        }
    }

    // first poll is due immediately
    pub fn start(&mut self, now_ms: u32) {
        self.running = true;
        self.next_due_ms = now_ms;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn set_interval_ms(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms.max(MIN_INTERVAL_MS);
    }

    /// True once per interval while running. Missed intervals are not
    /// replayed; the next deadline is measured from `now_ms`.
    pub fn due(&mut self, now_ms: u32) -> bool {
        if !self.running || !reached(now_ms, self.next_due_ms) {
            return false;
        }
        let next = self.next_due_ms.wrapping_add(self.interval_ms);
        self.next_due_ms = if reached(now_ms, next) {
            now_ms.wrapping_add(self.interval_ms)
        } else {
            next
        };
        true
    }

    /// Milliseconds until the next poll, `None` when stopped.
    pub fn until_due(&self, now_ms: u32) -> Option<u32> {
        if !self.running {
            return None;
        }
        if reached(now_ms, self.next_due_ms) {
            Some(0)
        } else {
            Some(self.next_due_ms.wrapping_sub(now_ms))
        }
    }
}

// wrapping-safe "now >= deadline"
#[inline]
fn reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

impl fmt::Display for PollSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.running {
            write!(f, "every {}ms", self.interval_ms)
        } else {
            write!(f, "stopped")
        }
    }
}
