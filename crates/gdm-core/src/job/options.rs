use crate::config::GdmConfig;
use crate::control::{InterruptArbiter, PauseGate};
use crate::fetch::{GalleryFetcher, ImageStore, NoopPostProcessor, PostProcessor};
use crate::progress::ProgressTracker;
use crate::range::RangeConfig;
use crate::retry::{CircuitBreaker, RetryPolicy};
use crate::state::StateStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Typed settings for one job, passed by value.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub policy: RetryPolicy,
    /// Range for this queue position (see [`RangeConfig::for_position`]).
    pub range: RangeConfig,
    pub download_dir: PathBuf,
    pub pause_poll: Duration,
    pub page_wait: Duration,
    pub skip_url_after_skipped_images: Option<usize>,
}

impl JobOptions {
    pub fn from_config(cfg: &GdmConfig) -> Self {
        Self {
            policy: cfg.retry.policy(),
            range: cfg.range,
            download_dir: cfg.resolved_download_dir(),
            pause_poll: Duration::from_millis(cfg.pause_poll_ms.max(1)),
            page_wait: Duration::from_millis(cfg.page_wait_ms),
            skip_url_after_skipped_images: cfg.skip_url_after_skipped_images,
        }
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::from_config(&GdmConfig::default())
    }
}

/// Shared collaborators and synchronization points handed to every job.
#[derive(Clone)]
pub struct JobEnv {
    pub fetcher: Arc<dyn GalleryFetcher>,
    pub store: Arc<dyn ImageStore>,
    pub post: Arc<dyn PostProcessor>,
    pub state: Arc<StateStore>,
    pub tracker: Arc<ProgressTracker>,
    pub arbiter: Arc<InterruptArbiter>,
    pub gate: Arc<PauseGate>,
    pub breaker: Arc<CircuitBreaker>,
}

impl JobEnv {
    /// Environment with fresh control state, no post-processing and a disabled breaker.
    pub fn new(
        fetcher: Arc<dyn GalleryFetcher>,
        store: Arc<dyn ImageStore>,
        state: Arc<StateStore>,
    ) -> Self {
        Self {
            fetcher,
            store,
            post: Arc::new(NoopPostProcessor),
            state,
            tracker: Arc::new(ProgressTracker::new()),
            arbiter: Arc::new(InterruptArbiter::new()),
            gate: Arc::new(PauseGate::new()),
            breaker: Arc::new(CircuitBreaker::disabled()),
        }
    }

    pub fn with_post(mut self, post: Arc<dyn PostProcessor>) -> Self {
        self.post = post;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Arc::new(breaker);
        self
    }
}
