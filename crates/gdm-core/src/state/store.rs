use super::{JobId, QueueEntry, StatusSink, UrlStatus};
use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore, ResumeCheckpoint};
use crate::sync::lock;
use anyhow::Result;
use std::sync::Mutex;

struct Inner {
    entries: Vec<QueueEntry>,
    checkpoints: Box<dyn CheckpointStore>,
    sink: Option<Box<dyn StatusSink>>,
}

impl Inner {
    fn find_mut(&mut self, id: JobId) -> Option<&mut QueueEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    fn apply_status(&mut self, id: JobId, status: UrlStatus, reason: Option<String>) -> bool {
        let Some(entry) = self.find_mut(id) else {
            return false;
        };
        entry.status = status;
        entry.reason = reason;
        let snapshot = entry.clone();
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.status_changed(&snapshot) {
                tracing::warn!(job_id = id, "failed to persist status {}: {:#}", status, e);
            }
        }
        true
    }
}

/// Single synchronization point for URL statuses and checkpoints.
///
/// The queue (in order) and the checkpoint store share one mutex, so a status
/// change and its checkpoint write are observed together. Status changes are
/// mirrored to an optional [`StatusSink`].
pub struct StateStore {
    inner: Mutex<Inner>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(Box::new(MemoryCheckpointStore::new()))
    }
}

impl StateStore {
    pub fn new(checkpoints: Box<dyn CheckpointStore>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                checkpoints,
                sink: None,
            }),
        }
    }

    pub fn with_sink(self, sink: Box<dyn StatusSink>) -> Self {
        lock(&self.inner).sink = Some(sink);
        self
    }

    /// Appends a new pending URL with the next free id.
    pub fn push(&self, url: impl Into<String>) -> JobId {
        let mut inner = lock(&self.inner);
        let id = inner.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let entry = QueueEntry {
            id,
            url: url.into(),
            status: UrlStatus::Pending,
            reason: None,
        };
        if let Some(sink) = inner.sink.as_mut() {
            if let Err(e) = sink.added(&entry) {
                tracing::warn!(job_id = id, "failed to persist new queue entry: {:#}", e);
            }
        }
        inner.entries.push(entry);
        id
    }

    /// Appends an entry loaded from elsewhere (e.g. the database), keeping its id.
    pub fn insert(&self, entry: QueueEntry) {
        lock(&self.inner).entries.push(entry);
    }

    pub fn entries(&self) -> Vec<QueueEntry> {
        lock(&self.inner).entries.clone()
    }

    pub fn entry(&self, id: JobId) -> Option<QueueEntry> {
        lock(&self.inner).entries.iter().find(|e| e.id == id).cloned()
    }

    /// Zero-based queue position of `id`.
    pub fn position(&self, id: JobId) -> Option<usize> {
        lock(&self.inner).entries.iter().position(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the URL of an entry and drops any checkpoint of the old URL.
    pub fn set_url(&self, id: JobId, url: impl Into<String>) -> Result<bool> {
        let mut inner = lock(&self.inner);
        let url = url.into();
        let Some(entry) = inner.find_mut(id) else {
            return Ok(false);
        };
        let old = std::mem::replace(&mut entry.url, url);
        inner.checkpoints.clear(&old)?;
        Ok(true)
    }

    /// Removes an entry and its checkpoint.
    pub fn remove(&self, id: JobId) -> Result<Option<QueueEntry>> {
        let mut inner = lock(&self.inner);
        let Some(pos) = inner.entries.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        let entry = inner.entries.remove(pos);
        inner.checkpoints.clear(&entry.url)?;
        if let Some(sink) = inner.sink.as_mut() {
            sink.removed(id)?;
        }
        Ok(Some(entry))
    }

    pub fn status(&self, id: JobId) -> Option<UrlStatus> {
        lock(&self.inner)
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.status)
    }

    /// Sets the status of `id`. Returns `false` for an unknown id.
    pub fn set_status(&self, id: JobId, status: UrlStatus, reason: Option<String>) -> bool {
        lock(&self.inner).apply_status(id, status, reason)
    }

    /// First pending entry at or after position `from`, wrapping to the front.
    pub fn next_pending(&self, from: usize) -> Option<(usize, QueueEntry)> {
        let inner = lock(&self.inner);
        let n = inner.entries.len();
        (0..n)
            .map(|i| (from + i) % n)
            .find(|&i| inner.entries[i].status == UrlStatus::Pending)
            .map(|i| (i, inner.entries[i].clone()))
    }

    /// Prepares a new run: entries left `downloading` or `paused` by an
    /// earlier run become `pending` again. Returns how many were reset.
    pub fn prepare_run(&self) -> usize {
        self.reset_where(|s| matches!(s, UrlStatus::Downloading | UrlStatus::Paused))
    }

    /// `paused` entries become `pending` (resume after a queue pause).
    pub fn reactivate_paused(&self) -> usize {
        self.reset_where(|s| s == UrlStatus::Paused)
    }

    fn reset_where<F: Fn(UrlStatus) -> bool>(&self, pred: F) -> usize {
        let mut inner = lock(&self.inner);
        let ids: Vec<JobId> = inner
            .entries
            .iter()
            .filter(|e| pred(e.status))
            .map(|e| e.id)
            .collect();
        for id in &ids {
            inner.apply_status(*id, UrlStatus::Pending, None);
        }
        ids.len()
    }

    pub fn checkpoint(&self, url: &str) -> Result<Option<ResumeCheckpoint>> {
        lock(&self.inner).checkpoints.get(url)
    }

    pub fn checkpoints(&self) -> Result<Vec<ResumeCheckpoint>> {
        lock(&self.inner).checkpoints.all()
    }

    pub fn save_checkpoint(&self, checkpoint: &ResumeCheckpoint) -> Result<()> {
        lock(&self.inner)
            .checkpoints
            .set(&checkpoint.url, checkpoint)
    }

    pub fn clear_checkpoint(&self, url: &str) -> Result<()> {
        lock(&self.inner).checkpoints.clear(url)
    }

    /// Writes `checkpoint` and sets the status of `id` under one lock.
    pub fn save_with_status(
        &self,
        id: JobId,
        checkpoint: &ResumeCheckpoint,
        status: UrlStatus,
        reason: Option<String>,
    ) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.checkpoints.set(&checkpoint.url, checkpoint)?;
        inner.apply_status(id, status, reason);
        Ok(())
    }

    /// Marks `id` skipped and clears its checkpoint under one lock.
    pub fn skip(&self, id: JobId, reason: Option<String>) -> Result<bool> {
        let mut inner = lock(&self.inner);
        let Some(url) = inner.find_mut(id).map(|e| e.url.clone()) else {
            return Ok(false);
        };
        inner.checkpoints.clear(&url)?;
        Ok(inner.apply_status(id, UrlStatus::Skipped, reason))
    }

    /// Marks `id` completed and clears its checkpoint under one lock.
    pub fn complete(&self, id: JobId) -> Result<bool> {
        let mut inner = lock(&self.inner);
        let Some(url) = inner.find_mut(id).map(|e| e.url.clone()) else {
            return Ok(false);
        };
        inner.checkpoints.clear(&url)?;
        Ok(inner.apply_status(id, UrlStatus::Completed, None))
    }
}
