use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level classification of a failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection, timeout or transient server failure.
    Network,
    /// TLS handshake or certificate failure.
    Ssl,
    /// Response could not be interpreted (missing image, unexpected markup).
    Parse,
    /// Destination folder vanished under the job.
    FolderMissing,
    /// Configured page range does not fit the gallery.
    RangeInvalid,
    /// Out of space, or the target path cannot exist on this filesystem.
    DiskFull,
    Unknown,
}

/// What the job loop should do next after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalAction {
    /// Retry the same page after [`Decision::delay`].
    Retry,
    /// Give up on this image, leave a placeholder and move to the next page.
    SkipImage,
    /// Give up on the whole gallery.
    SkipUrl,
    /// Checkpoint and pause the queue.
    Pause,
    /// End the job in error; the queue moves on.
    Abort,
    /// Drop the current image without a retry and keep going.
    Continue,
}

/// Action taken once a page has used up its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryLimitAction {
    #[default]
    #[serde(alias = "skip_image")]
    Skip,
    Abort,
}

/// Per-page state the policy needs to decide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptState {
    /// Failures so far on this page, including the one being decided (1-based).
    pub retry_count: u32,
    /// A degraded-transport retry was already made for this page.
    pub degraded_tried: bool,
    /// The shared circuit breaker is currently refusing requests.
    pub breaker_open: bool,
}

/// Decision returned by [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: FinalAction,
    /// Wait before the next attempt. Zero unless `action` is `Retry`.
    pub delay: Duration,
    /// Next attempt should use the degraded transport.
    pub degrade: bool,
}

impl Decision {
    fn act(action: FinalAction) -> Self {
        Self {
            action,
            delay: Duration::ZERO,
            degrade: false,
        }
    }
}

/// Retry policy for page downloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Failures allowed per page before `retry_limit_action` applies.
    pub max_retry_count: u32,
    /// First backoff step; doubles on each attempt.
    pub base_wait: Duration,
    /// Linear term added per attempt on top of the exponential one.
    pub retry_delay_increment: Duration,
    /// Upper bound on any single backoff.
    pub max_retry_delay: Duration,
    pub retry_limit_action: RetryLimitAction,
    /// Allow one retry with certificate verification disabled after an SSL failure.
    pub lower_security_mode: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: 3,
            base_wait: Duration::from_secs(3),
            retry_delay_increment: Duration::from_secs(10),
            max_retry_delay: Duration::from_secs(60),
            retry_limit_action: RetryLimitAction::Skip,
            lower_security_mode: false,
        }
    }
}

impl RetryPolicy {
    /// Decide what to do with a failure of `kind` given the page's attempt state.
    pub fn decide(&self, kind: ErrorKind, state: &AttemptState) -> Decision {
        match kind {
            ErrorKind::Network => {
                if state.breaker_open {
                    return Decision::act(FinalAction::Pause);
                }
                if state.retry_count < self.max_retry_count {
                    return Decision {
                        action: FinalAction::Retry,
                        delay: self.backoff(state.retry_count),
                        degrade: false,
                    };
                }
                Decision::act(self.limit_action())
            }
            ErrorKind::Ssl => {
                if self.lower_security_mode && !state.degraded_tried {
                    return Decision {
                        action: FinalAction::Retry,
                        delay: self.backoff(state.retry_count.max(1)),
                        degrade: true,
                    };
                }
                Decision::act(FinalAction::SkipImage)
            }
            ErrorKind::Parse | ErrorKind::RangeInvalid => Decision::act(FinalAction::Pause),
            ErrorKind::FolderMissing => Decision::act(FinalAction::SkipUrl),
            ErrorKind::DiskFull => Decision::act(FinalAction::Continue),
            ErrorKind::Unknown => Decision::act(FinalAction::SkipImage),
        }
    }

    /// Backoff before attempt `attempt + 1`, where `attempt` is 1-based:
    /// `base_wait * 2^(attempt-1) + retry_delay_increment * (attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        let exp = 1u32 << step.min(16);
        let raw = self
            .base_wait
            .saturating_mul(exp)
            .saturating_add(self.retry_delay_increment.saturating_mul(step));
        raw.min(self.max_retry_delay)
    }

    fn limit_action(&self) -> FinalAction {
        match self.retry_limit_action {
            RetryLimitAction::Skip => FinalAction::SkipImage,
            RetryLimitAction::Abort => FinalAction::Abort,
        }
    }
}
