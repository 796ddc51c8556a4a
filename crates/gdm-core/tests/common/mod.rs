#![allow(dead_code)]

pub mod fake_gallery;
pub mod http_server;

use gdm_core::job::{JobEnv, JobOptions};
use gdm_core::range::RangeConfig;
use gdm_core::retry::RetryPolicy;
use gdm_core::state::StateStore;
use gdm_core::storage::FsImageStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy with millisecond backoff so failure scenarios run fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retry_count: 3,
        base_wait: Duration::from_millis(1),
        retry_delay_increment: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

pub fn job_options(download_dir: &Path, range: RangeConfig) -> JobOptions {
    JobOptions {
        policy: fast_policy(),
        range,
        download_dir: download_dir.to_path_buf(),
        pause_poll: Duration::from_millis(5),
        page_wait: Duration::ZERO,
        skip_url_after_skipped_images: None,
    }
}

pub fn env(gallery: Arc<fake_gallery::FakeGallery>) -> JobEnv {
    JobEnv::new(
        gallery,
        Arc::new(FsImageStore::new()),
        Arc::new(StateStore::default()),
    )
}

/// Sorted file names in `dir`.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
