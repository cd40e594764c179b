//! Single-slot hand-off between a transport task and a blocking caller.
//!
//! A [`Rendezvous`] carries at most one value (or error) per arm cycle:
//!
//! ```text
//! Idle --arm--> Armed --fire--> Fired --wait--> Idle
//! ```
//!
//! The caller arms the slot before it triggers the remote side, the transport
//! task fires it exactly once, and the caller's `wait` takes the value out.
//! Contract violations are returned as [`Error::IllegalAdapterUse`] and logged
//! at `error` so they never pass silently.

use core::time::Duration;
use parking_lot::{Condvar, Mutex};
use sendwire_core::Error;
use std::time::Instant;

#[derive(Debug)]
enum Slot<T> {
    Idle,
    Armed,
    Fired(Result<T, Error>),
}

#[derive(Debug)]
struct State<T> {
    slot: Slot<T>,
    waiters: usize,
}

#[derive(Debug)]
pub struct Rendezvous<T> {
    state: Mutex<State<T>>,
    fired: Condvar,
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Rendezvous<T> {
    /// Creates an unarmed slot.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                slot: Slot::Idle,
                waiters: 0,
            }),
            fired: Condvar::new(),
        }
    }

    /// Starts a new cycle, discarding any value nobody waited for.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalAdapterUse`] while a caller is still blocked on the
    /// previous cycle. A caller that started waiting on an unarmed slot does
    /// not count: it is waiting for exactly this cycle.
    pub fn arm(&self) -> Result<(), Error> {
        let mut state = self.state.lock();
        if state.waiters > 0 && !matches!(state.slot, Slot::Idle) {
            return Err(violation("arm while a waiter is blocked"));
        }
        state.slot = Slot::Armed;
        Ok(())
    }

    /// Completes the current cycle with a value.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalAdapterUse`] if the slot is not armed or was already
    /// fired in this cycle.
    pub fn fire(&self, value: T) -> Result<(), Error> {
        self.complete(Ok(value))
    }

    /// Completes the current cycle with an error.
    ///
    /// # Errors
    ///
    /// Same as [`Rendezvous::fire`].
    pub fn fire_error(&self, err: Error) -> Result<(), Error> {
        self.complete(Err(err))
    }

    fn complete(&self, outcome: Result<T, Error>) -> Result<(), Error> {
        let mut state = self.state.lock();
        match state.slot {
            Slot::Armed => {
                state.slot = Slot::Fired(outcome);
                self.fired.notify_one();
                Ok(())
            }
            Slot::Fired(_) => Err(violation("fire twice in one cycle")),
            Slot::Idle => Err(violation("fire without arm")),
        }
    }

    /// Blocks until the current cycle fires and takes its outcome.
    ///
    /// Waiting on an unarmed slot blocks until it is armed and fired. The
    /// slot is unarmed again afterwards.
    pub fn wait(&self) -> Result<T, Error> {
        let mut state = self.state.lock();
        state.waiters += 1;
        while !matches!(state.slot, Slot::Fired(_)) {
            self.fired.wait(&mut state);
        }
        state.waiters -= 1;
        Self::take(&mut state)
    }

    /// Like [`Rendezvous::wait`] but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`Error::TimeoutExceeded`] if nothing fired in time. The slot stays
    /// armed, so a late `fire` is still accepted and overwritten by the next
    /// `arm`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, Error> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        state.waiters += 1;
        while !matches!(state.slot, Slot::Fired(_)) {
            if self.fired.wait_until(&mut state, deadline).timed_out()
                && !matches!(state.slot, Slot::Fired(_))
            {
                state.waiters -= 1;
                return Err(Error::TimeoutExceeded { waited: timeout });
            }
        }
        state.waiters -= 1;
        Self::take(&mut state)
    }

    /// `true` between `arm` and `fire`.
    pub fn is_armed(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Armed)
    }

    /// `true` between `fire` and the `wait` that consumes it.
    pub fn is_fired(&self) -> bool {
        matches!(self.state.lock().slot, Slot::Fired(_))
    }

    fn take(state: &mut State<T>) -> Result<T, Error> {
        match core::mem::replace(&mut state.slot, Slot::Idle) {
            Slot::Fired(outcome) => outcome,
            // Unreachable while the lock is held after a fired check.
            _ => Err(violation("slot emptied under a waiter")),
        }
    }
}

fn violation(context: &str) -> Error {
    tracing::error!("Rendezvous contract violated: {context}");
    Error::illegal(context)
}
