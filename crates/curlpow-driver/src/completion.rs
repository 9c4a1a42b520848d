//! Completion signalling between the interrupt side and blocked readers
//!
//! The kernel driver this replaces parked readers on a wait queue and had
//! its interrupt handler set a `write_done` flag. Userspace gets the same
//! shape from a mutex-guarded flag and a condvar: the UIO interrupt
//! listener (or the simulated engine) raises completion, readers block on
//! [`Completion::wait`].

use crate::error::{CurlError, Result};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No completion has been raised since the last reset.
    Pending,
    /// The engine finished; counters are valid to drain.
    Done,
    /// A waiter was asked to give up (signal/shutdown analog).
    Cancelled,
}

/// One-shot completion flag with blocking wait.
///
/// The flag is shared between the device context and whatever plays the
/// interrupt handler. A reader resets it, triggers the hardware, then
/// waits; cancellation leaves the flag reset so the next reader starts
/// clean rather than inheriting an undefined state.
#[derive(Debug)]
pub struct Completion {
    state: Mutex<State>,
    cond: Condvar,
}

impl Completion {
    /// Create a completion in the pending state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned flag mutex only means a panicking thread held it;
        // the state enum is always valid, so recover the guard.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the flag ahead of a new hardware round.
    pub fn reset(&self) {
        *self.lock() = State::Pending;
    }

    /// Raise completion and wake all waiters. Called from the interrupt
    /// listener thread (or the simulated engine).
    pub fn complete(&self) {
        *self.lock() = State::Done;
        self.cond.notify_all();
    }

    /// Cancel any blocked wait and wake all waiters.
    pub fn cancel(&self) {
        *self.lock() = State::Cancelled;
        self.cond.notify_all();
    }

    /// Block until completion is raised, the wait is cancelled, or
    /// `timeout` elapses.
    ///
    /// On cancellation the flag is reset before the error propagates, so
    /// the next round does not observe a stale state.
    ///
    /// # Errors
    ///
    /// - [`CurlError::Interrupted`] if [`cancel`](Self::cancel) was called.
    /// - [`CurlError::Timeout`] if `timeout` elapsed first.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();

        loop {
            match *state {
                State::Done => return Ok(()),
                State::Cancelled => {
                    *state = State::Pending;
                    return Err(CurlError::Interrupted);
                }
                State::Pending => {}
            }

            state = match deadline {
                None => self
                    .cond
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        let duration_ms = timeout
                            .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                            .unwrap_or_default();
                        return Err(CurlError::Timeout { duration_ms });
                    };
                    let (guard, _) = self
                        .cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard
                }
            };
        }
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn complete_wakes_waiter() {
        let c = Arc::new(Completion::new());
        let waiter = {
            let c = Arc::clone(&c);
            thread::spawn(move || c.wait(Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(20));
        c.complete();
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn cancel_interrupts_and_resets() {
        let c = Arc::new(Completion::new());
        let waiter = {
            let c = Arc::clone(&c);
            thread::spawn(move || c.wait(Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(20));
        c.cancel();
        assert!(matches!(
            waiter.join().unwrap(),
            Err(CurlError::Interrupted)
        ));

        // The flag must be usable again after cancellation.
        c.complete();
        assert!(c.wait(Some(Duration::from_millis(100))).is_ok());
    }

    #[test]
    fn wait_times_out() {
        let c = Completion::new();
        let err = c.wait(Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, CurlError::Timeout { .. }));
    }

    #[test]
    fn completion_raised_before_wait_is_observed() {
        let c = Completion::new();
        c.complete();
        assert!(c.wait(None).is_ok());
    }

    #[test]
    fn reset_clears_previous_completion() {
        let c = Completion::new();
        c.complete();
        c.reset();
        let err = c.wait(Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, CurlError::Timeout { .. }));
    }
}
