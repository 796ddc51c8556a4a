use super::RunState;
use crate::control::{InterruptArbiter, PauseGate, RestartMode};
use crate::state::{JobId, StateStore, UrlStatus};
use crate::sync::lock;
use anyhow::{bail, Result};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct ControlState {
    run_state: RunState,
    resume_requested: bool,
}

/// Run state shared between the scheduler and its handles.
#[derive(Debug, Default)]
pub(crate) struct RunControl {
    inner: Mutex<ControlState>,
    cond: Condvar,
}

impl RunControl {
    pub(crate) fn state(&self) -> RunState {
        lock(&self.inner).run_state
    }

    pub(crate) fn set_state(&self, state: RunState) {
        lock(&self.inner).run_state = state;
        self.cond.notify_all();
    }

    /// Enters the paused state, forgetting any resume requested earlier.
    pub(crate) fn enter_pause(&self) {
        let mut inner = lock(&self.inner);
        inner.run_state = RunState::Paused;
        inner.resume_requested = false;
    }

    pub(crate) fn request_resume(&self) {
        lock(&self.inner).resume_requested = true;
        self.cond.notify_all();
    }

    pub(crate) fn wake(&self) {
        self.cond.notify_all();
    }

    /// Waits up to `timeout` for a resume request; consumes it if present.
    pub(crate) fn wait_resume(&self, timeout: Duration) -> bool {
        let mut inner = lock(&self.inner);
        if !inner.resume_requested {
            inner = match self.cond.wait_timeout(inner, timeout) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        std::mem::take(&mut inner.resume_requested)
    }
}

/// Cloneable handle for user requests against a running (or idle) queue.
///
/// Requests for the job currently running are delivered as interrupts; for
/// any other entry they are applied to the queue directly.
#[derive(Clone)]
pub struct QueueHandle {
    pub(crate) state: Arc<StateStore>,
    pub(crate) arbiter: Arc<InterruptArbiter>,
    pub(crate) gate: Arc<PauseGate>,
    pub(crate) control: Arc<RunControl>,
}

impl QueueHandle {
    /// Skips `id`. Returns `false` if no such entry exists.
    pub fn skip(&self, id: JobId) -> Result<bool> {
        if self.arbiter.request_skip(id) {
            self.gate.nudge();
            return Ok(true);
        }
        self.state.skip(id, Some("skipped by user".to_string()))
    }

    /// Restarts `id`: the running job is interrupted and rerun; any other
    /// entry goes back to pending. `Fresh` drops its checkpoint.
    pub fn restart(&self, id: JobId, mode: RestartMode) -> Result<bool> {
        if self.arbiter.request_restart(id, mode) {
            self.gate.nudge();
            return Ok(true);
        }
        let Some(entry) = self.state.entry(id) else {
            return Ok(false);
        };
        if mode == RestartMode::Fresh {
            self.state.clear_checkpoint(&entry.url)?;
        }
        self.state.set_status(id, UrlStatus::Pending, None);
        self.control.wake();
        Ok(true)
    }

    /// Queues a new URL. A running scheduler picks it up once it reaches the
    /// end of the entries ahead of it.
    pub fn push(&self, url: impl Into<String>) -> JobId {
        let id = self.state.push(url);
        self.control.wake();
        id
    }

    /// Removes an entry that is not running. Returns `false` if no such entry exists.
    pub fn remove(&self, id: JobId) -> Result<bool> {
        if self.arbiter.active() == Some(id) {
            bail!("gallery {} is downloading; skip it first", id);
        }
        Ok(self.state.remove(id)?.is_some())
    }

    /// Checkpoints the running job and pauses the queue.
    pub fn pause(&self) {
        self.arbiter.request_pause();
        self.gate.nudge();
    }

    /// Resumes a paused queue (and releases a held gate).
    pub fn resume(&self) {
        self.control.request_resume();
        self.gate.release();
    }

    /// Checkpoints the running job and ends the run.
    pub fn stop(&self) {
        self.arbiter.request_stop();
        self.gate.nudge();
        self.control.wake();
    }

    /// Parks the worker at its next page boundary without ending the job.
    pub fn hold(&self) {
        self.gate.hold();
    }

    pub fn release(&self) {
        self.gate.release();
    }

    pub fn run_state(&self) -> RunState {
        self.control.state()
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.arbiter.active()
    }
}
