//! Per-job mutable state.

use crate::checkpoint::{CheckpointReason, JobStage, ResumeCheckpoint, StageData, SubStage};
use crate::range::DownloadRange;
use crate::resume_db::unix_timestamp;
use crate::state::JobId;
use std::path::{Path, PathBuf};

/// State of one in-flight gallery job.
///
/// Owned by the job loop running it and never shared; everything other
/// threads need to see goes through the progress tracker or the state store.
/// Page numbers are relative to the job's range window.
#[derive(Debug, Clone)]
pub struct DownloadContext {
    pub job_id: JobId,
    pub url: String,
    pub title: String,
    pub save_folder: PathBuf,
    /// Page being worked on (or last written when `sub_stage` is `After`).
    pub current_page: usize,
    /// Page the loop started from; above 1 when resuming.
    pub start_page: usize,
    /// Pages in the range window.
    pub total_pages: usize,
    pub download_range: DownloadRange,
    pub stage: JobStage,
    pub sub_stage: SubStage,
    pub stage_data: StageData,
    pub downloaded_pages: usize,
    pub failed_pages: Vec<usize>,
    pub skipped_pages: Vec<usize>,
    pub error_occurred: bool,
    /// Failures on the current page.
    pub retry_count: u32,
    pub is_resume: bool,
}

impl DownloadContext {
    pub fn new(job_id: JobId, url: impl Into<String>) -> Self {
        Self {
            job_id,
            url: url.into(),
            title: String::new(),
            save_folder: PathBuf::new(),
            current_page: 1,
            start_page: 1,
            total_pages: 0,
            download_range: DownloadRange::default(),
            stage: JobStage::Initial,
            sub_stage: SubStage::Before,
            stage_data: StageData::default(),
            downloaded_pages: 0,
            failed_pages: Vec::new(),
            skipped_pages: Vec::new(),
            error_occurred: false,
            retry_count: 0,
            is_resume: false,
        }
    }

    /// Picks up where `cp` left off: folder, page lists and the resume page.
    pub fn restore_from(&mut self, cp: &ResumeCheckpoint) {
        self.save_folder = cp.folder.clone();
        self.start_page = cp.resume_page();
        self.current_page = self.start_page;
        self.sub_stage = SubStage::Before;
        self.stage_data = cp.stage_data.clone();
        self.skipped_pages = cp.stage_data.skipped_pages.clone();
        self.failed_pages = cp.stage_data.failed_pages.clone();
        if let Some(range) = cp.download_range {
            self.download_range = range;
        }
        self.is_resume = true;
    }

    /// Moves to `page`, before its image is written.
    pub fn begin_page(&mut self, page: usize) {
        self.current_page = page;
        self.sub_stage = SubStage::Before;
    }

    /// Records that `page` is on disk at `path`. Backfilled pages (behind
    /// the current one) do not move the resume position.
    pub fn mark_page_saved(&mut self, page: usize, path: &Path) {
        if page >= self.current_page {
            self.current_page = page;
            self.sub_stage = SubStage::After;
        }
        self.downloaded_pages += 1;
        self.stage_data.save_path = Some(path.to_path_buf());
        self.skipped_pages.retain(|p| *p != page);
        self.failed_pages.retain(|p| *p != page);
        self.reset_retry();
    }

    /// Page given up on after the retry limit (a placeholder was written).
    pub fn add_skipped_page(&mut self, page: usize) {
        if !self.skipped_pages.contains(&page) {
            self.skipped_pages.push(page);
        }
        self.error_occurred = true;
    }

    /// Page dropped without a retry.
    pub fn add_failed_page(&mut self, page: usize) {
        if !self.failed_pages.contains(&page) {
            self.failed_pages.push(page);
        }
        self.error_occurred = true;
    }

    /// Counts a failure on the current page and returns the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.retry_count += 1;
        self.error_occurred = true;
        self.retry_count
    }

    /// Clears the failure state after a page succeeds.
    pub fn reset_retry(&mut self) {
        self.retry_count = 0;
        self.error_occurred = false;
    }

    pub fn absolute_page(&self, relative: usize) -> usize {
        self.download_range.absolute(relative)
    }

    /// Any page skipped or failed: the job cannot end `completed`.
    pub fn has_gaps(&self) -> bool {
        !self.skipped_pages.is_empty() || !self.failed_pages.is_empty()
    }

    /// Earlier gaps to retry before continuing, in page order.
    pub fn backfill_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self
            .skipped_pages
            .iter()
            .chain(self.failed_pages.iter())
            .copied()
            .filter(|p| *p < self.start_page)
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    pub fn to_checkpoint(&self, reason: CheckpointReason) -> ResumeCheckpoint {
        let mut stage_data = self.stage_data.clone();
        stage_data.skipped_pages = self.skipped_pages.clone();
        stage_data.failed_pages = self.failed_pages.clone();
        ResumeCheckpoint {
            url: self.url.clone(),
            page: self.current_page,
            absolute_page: Some(self.absolute_page(self.current_page)),
            folder: self.save_folder.clone(),
            stage: self.stage,
            sub_stage: self.sub_stage,
            stage_data,
            download_range: Some(self.download_range),
            reason,
            timestamp: unix_timestamp(),
        }
    }
}
