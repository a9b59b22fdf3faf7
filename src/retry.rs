//! Bounded retry with a fixed delay

use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op` until it yields a value or the attempts run out.
    ///
    /// `op` receives the zero-based attempt number. `Ok(None)` means "not
    /// there yet" and is retried after `delay`; `Err` stops immediately.
    /// Exhaustion yields `Ok(None)`.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<Option<T>, E>
    where
        F: FnMut(u32) -> Result<Option<T>, E>,
    {
        for attempt in 0..self.attempts {
            if let Some(value) = op(attempt)? {
                return Ok(Some(value));
            }
            if attempt + 1 < self.attempts && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
        Ok(None)
    }
}
