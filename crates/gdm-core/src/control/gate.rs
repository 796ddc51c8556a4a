use crate::sync::lock;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Cooperative pause: while held, the worker parks at its next page boundary.
///
/// Waiting re-checks an interrupt predicate every `poll`, so a skip or stop
/// still gets through while the gate is held.
#[derive(Debug, Default)]
pub struct PauseGate {
    held: Mutex<bool>,
    cond: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&self) {
        *lock(&self.held) = true;
    }

    pub fn release(&self) {
        *lock(&self.held) = false;
        self.cond.notify_all();
    }

    pub fn is_held(&self) -> bool {
        *lock(&self.held)
    }

    /// Wakes waiters so they re-check their interrupt predicate.
    pub fn nudge(&self) {
        self.cond.notify_all();
    }

    /// Blocks while the gate is held. Returns `false` if `interrupted` became
    /// true while waiting, `true` once released (or if never held).
    pub fn wait_while_held<F>(&self, poll: Duration, mut interrupted: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut held = lock(&self.held);
        while *held {
            drop(held);
            if interrupted() {
                return false;
            }
            held = lock(&self.held);
            if !*held {
                break;
            }
            held = match self.cond.wait_timeout(held, poll) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}
