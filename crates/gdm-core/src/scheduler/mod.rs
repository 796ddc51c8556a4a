//! Queue scheduler.
//!
//! Runs one gallery job at a time on a dedicated worker thread, advances
//! through pending URLs, and reacts to the job's [`Directive`](crate::job::Directive):
//! continue, pause the queue, stop the run, or rerun the same URL. User
//! requests arrive through a cloneable [`QueueHandle`].

mod handle;
mod latch;
mod run;

pub use handle::QueueHandle;
pub use latch::CompletionLatch;
pub use run::QueueScheduler;

use crate::config::GdmConfig;
use crate::job::{JobOptions, JobOutcome};
use crate::state::{QueueEntry, UrlStatus};
use std::time::Duration;

/// State of the whole queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Stopped => "stopped",
            RunState::Completed => "completed",
        }
    }
}

/// Hooks for run-level events. Every method defaults to a no-op.
pub trait RunListener: Send + Sync {
    fn job_started(&self, _entry: &QueueEntry) {}

    fn job_finished(&self, _outcome: &JobOutcome) {}

    fn queue_paused(&self, _reason: Option<&str>) {}

    fn queue_resumed(&self) {}

    /// Called once per run, when no pending URL remains.
    fn run_complete(&self, _summary: &RunSummary) {}
}

/// Tally of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub incomplete: usize,
    pub skipped: usize,
    pub failed: usize,
    pub paused: usize,
    pub final_state: RunState,
}

impl RunSummary {
    pub(crate) fn record(&mut self, outcome: &JobOutcome) {
        match outcome.status {
            UrlStatus::Completed => self.completed += 1,
            UrlStatus::Incomplete => self.incomplete += 1,
            UrlStatus::Skipped => self.skipped += 1,
            UrlStatus::Error => self.failed += 1,
            UrlStatus::Paused => self.paused += 1,
            UrlStatus::Pending | UrlStatus::Downloading => {}
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Template for every job; the range is narrowed per queue position.
    pub job: JobOptions,
    /// Lift error-induced pauses on our own after this long.
    pub auto_resume_delay: Option<Duration>,
    /// How long to wait for a worker to notice a stop request.
    pub worker_join_timeout: Duration,
    /// End the run instead of waiting when the queue pauses.
    pub exit_on_pause: bool,
}

impl SchedulerOptions {
    pub fn from_config(cfg: &GdmConfig) -> Self {
        Self {
            job: JobOptions::from_config(cfg),
            auto_resume_delay: cfg.scheduler.auto_resume_delay_secs.map(Duration::from_secs),
            worker_join_timeout: Duration::from_secs(cfg.scheduler.worker_join_timeout_secs),
            exit_on_pause: false,
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from_config(&GdmConfig::default())
    }
}
