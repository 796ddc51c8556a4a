use crate::state::JobId;
use crate::sync::lock;
use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// How a restarted job picks up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartMode {
    /// Keep the checkpoint and continue where the job stopped.
    #[default]
    Resume,
    /// Drop the checkpoint and start from the first page.
    Fresh,
}

/// Pending interrupt for a job, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Skip,
    Restart(RestartMode),
    Pause,
    Stop,
}

#[derive(Debug, Default)]
struct Flags {
    active: Option<JobId>,
    skip: HashSet<JobId>,
    restart: HashMap<JobId, RestartMode>,
    pause: bool,
    stop: bool,
}

/// Shared flags for user interrupts.
///
/// Skip and restart target one job; pause and stop target the run. When
/// several are pending, [`InterruptArbiter::check`] reports them in the order
/// skip, restart, pause, stop.
#[derive(Debug, Default)]
pub struct InterruptArbiter {
    flags: Mutex<Flags>,
    changed: Condvar,
}

impl InterruptArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority pending interrupt for `job`, without consuming it.
    pub fn check(&self, job: JobId) -> Option<Interrupt> {
        Self::pending(&lock(&self.flags), job)
    }

    fn pending(flags: &Flags, job: JobId) -> Option<Interrupt> {
        if flags.skip.contains(&job) {
            return Some(Interrupt::Skip);
        }
        if let Some(mode) = flags.restart.get(&job) {
            return Some(Interrupt::Restart(*mode));
        }
        if flags.pause {
            return Some(Interrupt::Pause);
        }
        if flags.stop {
            return Some(Interrupt::Stop);
        }
        None
    }

    /// Marks `job` as the one currently running (or none).
    pub fn set_active(&self, job: Option<JobId>) {
        lock(&self.flags).active = job;
    }

    pub fn active(&self) -> Option<JobId> {
        lock(&self.flags).active
    }

    /// Requests a skip. Returns whether `job` is the running job; otherwise the
    /// caller applies the skip to the queue directly.
    pub fn request_skip(&self, job: JobId) -> bool {
        let mut flags = lock(&self.flags);
        if flags.active != Some(job) {
            return false;
        }
        flags.skip.insert(job);
        drop(flags);
        self.changed.notify_all();
        true
    }

    /// Requests a restart of the running job. Same return contract as
    /// [`InterruptArbiter::request_skip`].
    pub fn request_restart(&self, job: JobId, mode: RestartMode) -> bool {
        let mut flags = lock(&self.flags);
        if flags.active != Some(job) {
            return false;
        }
        let entry = flags.restart.entry(job).or_insert(mode);
        if mode == RestartMode::Fresh {
            *entry = RestartMode::Fresh;
        }
        drop(flags);
        self.changed.notify_all();
        true
    }

    pub fn request_pause(&self) {
        lock(&self.flags).pause = true;
        self.changed.notify_all();
    }

    pub fn request_stop(&self) {
        lock(&self.flags).stop = true;
        self.changed.notify_all();
    }

    pub fn take_skip(&self, job: JobId) -> bool {
        lock(&self.flags).skip.remove(&job)
    }

    pub fn take_restart(&self, job: JobId) -> Option<RestartMode> {
        lock(&self.flags).restart.remove(&job)
    }

    pub fn take_pause(&self) -> bool {
        std::mem::take(&mut lock(&self.flags).pause)
    }

    pub fn pause_requested(&self) -> bool {
        lock(&self.flags).pause
    }

    pub fn stop_requested(&self) -> bool {
        lock(&self.flags).stop
    }

    pub fn clear_stop(&self) {
        lock(&self.flags).stop = false;
    }

    /// Drops every per-job flag for `job` and releases the active slot if
    /// `job` holds it (used once the job has ended).
    pub fn forget(&self, job: JobId) {
        let mut flags = lock(&self.flags);
        if flags.active == Some(job) {
            flags.active = None;
        }
        flags.skip.remove(&job);
        flags.restart.remove(&job);
    }

    /// Sleeps up to `dur`, waking early with the pending interrupt for `job`.
    pub fn sleep(&self, job: JobId, dur: Duration) -> Option<Interrupt> {
        let deadline = Instant::now() + dur;
        let mut flags = lock(&self.flags);
        loop {
            if let Some(i) = Self::pending(&flags, job) {
                return Some(i);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            flags = match self.changed.wait_timeout(flags, deadline - now) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
