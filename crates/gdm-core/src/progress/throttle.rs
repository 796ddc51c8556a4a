//! Rate-limited observer wrapper.

use super::snapshot::{ProgressPhase, ProgressSnapshot};
use super::tracker::ProgressObserver;
use crate::state::JobId;
use crate::sync::lock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Forwards at most one snapshot per `interval` per job to the inner observer.
///
/// Terminal and paused snapshots are always forwarded and reset the job's window.
pub struct ThrottledObserver {
    inner: Arc<dyn ProgressObserver>,
    interval: Duration,
    last: Mutex<HashMap<JobId, Instant>>,
}

impl ThrottledObserver {
    pub fn new(inner: Arc<dyn ProgressObserver>, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            last: Mutex::new(HashMap::new()),
        }
    }

    fn should_forward(&self, snap: &ProgressSnapshot) -> bool {
        let now = Instant::now();
        let mut last = lock(&self.last);
        if snap.phase.is_terminal() || snap.phase == ProgressPhase::Paused {
            last.remove(&snap.job_id);
            return true;
        }
        match last.get(&snap.job_id) {
            Some(t) if now.duration_since(*t) < self.interval => false,
            _ => {
                last.insert(snap.job_id, now);
                true
            }
        }
    }
}

impl ProgressObserver for ThrottledObserver {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        if self.should_forward(snapshot) {
            self.inner.on_progress(snapshot);
        }
    }
}
