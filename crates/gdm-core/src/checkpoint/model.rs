use crate::range::DownloadRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle stage of a gallery job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Initial,
    FetchingMetadata,
    DownloadingPages,
    Completed,
    Paused,
    Error,
    Skipped,
    Incomplete,
}

/// Position within the image-download stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStage {
    /// The page's image has not been confirmed written.
    #[default]
    Before,
    /// The page's image is on disk.
    After,
}

/// Stage-specific details carried across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageData {
    /// Last image written for this job.
    pub save_path: Option<PathBuf>,
    /// Relative pages given up on after the retry limit.
    pub skipped_pages: Vec<usize>,
    /// Relative pages dropped without a retry (e.g. disk full).
    pub failed_pages: Vec<usize>,
}

/// Why a checkpoint was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointReason {
    UserPause,
    UserStop,
    Restart,
    ImageFailed,
    JobError,
    ConfigError,
    FolderMissing,
}

impl fmt::Display for CheckpointReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckpointReason::UserPause => "paused by user",
            CheckpointReason::UserStop => "stopped by user",
            CheckpointReason::Restart => "restart requested",
            CheckpointReason::ImageFailed => "image download failed",
            CheckpointReason::JobError => "job error",
            CheckpointReason::ConfigError => "configuration error",
            CheckpointReason::FolderMissing => "download folder missing",
        };
        f.write_str(s)
    }
}

/// Saved position of an interrupted gallery job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCheckpoint {
    pub url: String,
    /// Relative page within the job's range window.
    pub page: usize,
    /// Absolute gallery page for `page`, used to remap after a range change.
    pub absolute_page: Option<usize>,
    pub folder: PathBuf,
    pub stage: JobStage,
    pub sub_stage: SubStage,
    #[serde(default)]
    pub stage_data: StageData,
    pub download_range: Option<DownloadRange>,
    pub reason: CheckpointReason,
    /// Unix seconds.
    pub timestamp: i64,
}

impl ResumeCheckpoint {
    /// Relative page to resume at: the next one if this page was written, else this one.
    pub fn resume_page(&self) -> usize {
        match self.sub_stage {
            SubStage::After => self.page + 1,
            SubStage::Before => self.page.max(1),
        }
    }
}
