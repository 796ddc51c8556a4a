use super::snapshot::{ProgressPhase, ProgressSnapshot, ProgressUpdate};
use crate::state::JobId;
use crate::sync::lock;
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Receives every published snapshot. May be called from any thread.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Thread-safe registry of per-job progress snapshots.
///
/// Unknown job ids are not an error: mutators return `None`.
#[derive(Default)]
pub struct ProgressTracker {
    snapshots: Mutex<HashMap<JobId, Arc<ProgressSnapshot>>>,
    observers: Mutex<Vec<Arc<dyn ProgressObserver>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) tracking `job`.
    pub fn create(
        &self,
        job: JobId,
        phase: ProgressPhase,
        total: usize,
        status: impl Into<String>,
    ) -> Arc<ProgressSnapshot> {
        let snap = Arc::new(ProgressSnapshot {
            job_id: job,
            phase,
            current: 0,
            total,
            status: status.into(),
            timestamp: SystemTime::now(),
            metadata: BTreeMap::new(),
        });
        lock(&self.snapshots).insert(job, Arc::clone(&snap));
        self.notify(&snap);
        snap
    }

    /// Applies `change` to the job's snapshot; metadata keys are merged.
    pub fn update(&self, job: JobId, change: ProgressUpdate) -> Option<Arc<ProgressSnapshot>> {
        self.replace(job, |prev| {
            let mut next = prev.clone();
            if let Some(total) = change.total {
                next.total = total;
            }
            if let Some(current) = change.current {
                next.current = current;
            }
            if let Some(status) = change.status {
                next.status = status;
            }
            if let Some(phase) = change.phase {
                next.phase = phase;
            }
            next.metadata.extend(change.metadata);
            next
        })
    }

    /// Advances `current` by `delta`, never past `total` when the total is known.
    pub fn increment(&self, job: JobId, delta: usize) -> Option<Arc<ProgressSnapshot>> {
        self.replace(job, |prev| {
            let mut next = prev.clone();
            next.current = prev.current.saturating_add(delta);
            if next.total > 0 {
                next.current = next.current.min(next.total);
            }
            next
        })
    }

    pub fn complete(&self, job: JobId, status: impl Into<String>) -> Option<Arc<ProgressSnapshot>> {
        let status = status.into();
        self.replace(job, move |prev| {
            let mut next = prev.clone();
            next.phase = ProgressPhase::Completed;
            next.current = next.total.max(next.current);
            next.status = status;
            next
        })
    }

    pub fn error(&self, job: JobId, message: impl Into<String>) -> Option<Arc<ProgressSnapshot>> {
        let message = message.into();
        self.replace(job, move |prev| {
            let mut next = prev.clone();
            next.phase = ProgressPhase::Error;
            next.status = message;
            next
        })
    }

    pub fn get(&self, job: JobId) -> Option<Arc<ProgressSnapshot>> {
        lock(&self.snapshots).get(&job).cloned()
    }

    /// Stops tracking `job`. Observers are not notified.
    pub fn remove(&self, job: JobId) -> Option<Arc<ProgressSnapshot>> {
        lock(&self.snapshots).remove(&job)
    }

    /// Snapshots of every job not yet completed or failed, ordered by job id.
    pub fn active(&self) -> Vec<Arc<ProgressSnapshot>> {
        let mut v: Vec<_> = lock(&self.snapshots)
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        v.sort_by_key(|s| s.job_id);
        v
    }

    pub fn subscribe(&self, observer: Arc<dyn ProgressObserver>) {
        lock(&self.observers).push(observer);
    }

    /// Removes a previously subscribed observer (compared by pointer).
    pub fn unsubscribe(&self, observer: &Arc<dyn ProgressObserver>) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    fn replace<F>(&self, job: JobId, f: F) -> Option<Arc<ProgressSnapshot>>
    where
        F: FnOnce(&ProgressSnapshot) -> ProgressSnapshot,
    {
        let snap = {
            let mut snapshots = lock(&self.snapshots);
            let prev = snapshots.get(&job)?;
            let mut next = f(prev);
            next.timestamp = SystemTime::now();
            let next = Arc::new(next);
            snapshots.insert(job, Arc::clone(&next));
            next
        };
        self.notify(&snap);
        Some(snap)
    }

    fn notify(&self, snap: &ProgressSnapshot) {
        let observers: Vec<_> = lock(&self.observers).clone();
        for observer in observers {
            let result = catch_unwind(AssertUnwindSafe(|| observer.on_progress(snap)));
            if result.is_err() {
                tracing::warn!(job_id = snap.job_id, "progress observer panicked");
            }
        }
    }
}
