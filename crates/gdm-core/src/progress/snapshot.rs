use crate::state::JobId;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Coarse phase of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressPhase {
    Idle,
    UrlFetching,
    ImageDownloading,
    ImageProcessing,
    Completed,
    Error,
    Paused,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Idle => "idle",
            ProgressPhase::UrlFetching => "url_fetching",
            ProgressPhase::ImageDownloading => "image_downloading",
            ProgressPhase::ImageProcessing => "image_processing",
            ProgressPhase::Completed => "completed",
            ProgressPhase::Error => "error",
            ProgressPhase::Paused => "paused",
        }
    }

    /// Completed or error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressPhase::Completed | ProgressPhase::Error)
    }
}

/// Point-in-time progress of one job. Never mutated once published.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub job_id: JobId,
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: usize,
    pub status: String,
    pub timestamp: SystemTime,
    pub metadata: BTreeMap<String, String>,
}

impl ProgressSnapshot {
    /// Percentage in 0..=100; 0 when the total is unknown.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64 * 100.0).min(100.0)
    }

    pub fn is_active(&self) -> bool {
        !self.phase.is_terminal()
    }
}

/// Partial change applied by [`super::ProgressTracker::update`]. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub current: Option<usize>,
    pub total: Option<usize>,
    pub status: Option<String>,
    pub phase: Option<ProgressPhase>,
    pub metadata: BTreeMap<String, String>,
}

impl ProgressUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(mut self, current: usize) -> Self {
        self.current = Some(current);
        self
    }

    pub fn total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn phase(mut self, phase: ProgressPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
