//! Per-gallery page loop.
//!
//! A job walks `INITIAL → FETCHING_METADATA → DOWNLOADING_PAGES` and ends in
//! one of completed, incomplete, paused, skipped or error. It owns its
//! [`DownloadContext`](crate::context::DownloadContext) and reports back to the
//! scheduler through a [`JobOutcome`].

mod attempt;
mod options;
mod run;

pub use options::{JobEnv, JobOptions};
pub use run::run_job;

use crate::state::{JobId, UrlStatus};

/// What the scheduler should do after a job returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Move on to the next pending URL.
    Continue,
    /// Stop taking new jobs until resumed. `auto_resume` marks pauses caused
    /// by transient failures, which the scheduler may lift on its own.
    PauseQueue { auto_resume: bool },
    /// End the run.
    StopRun,
    /// Run the same URL again (restart request).
    RerunJob,
}

/// Final word of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub status: UrlStatus,
    pub reason: Option<String>,
    pub directive: Directive,
}

impl JobOutcome {
    pub(crate) fn new(job_id: JobId, status: UrlStatus, directive: Directive) -> Self {
        Self {
            job_id,
            status,
            reason: None,
            directive,
        }
    }

    pub(crate) fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
