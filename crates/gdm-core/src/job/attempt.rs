//! Retry loop around one fetch step, driven by the retry policy.

use super::JobEnv;
use crate::context::DownloadContext;
use crate::control::Interrupt;
use crate::fetch::{FetchError, TransportMode};
use crate::retry::{classify, AttemptState, Decision, ErrorKind, FinalAction, RetryPolicy};

pub(super) enum Attempt<T> {
    Done(T),
    /// The policy gave up; `decision.action` is never `Retry`.
    Failed {
        error: FetchError,
        kind: ErrorKind,
        decision: Decision,
    },
    /// An interrupt arrived during a backoff sleep.
    Interrupted(Interrupt),
}

/// Runs `f` until it succeeds, the policy stops retrying, or an interrupt
/// cuts a backoff short. Failures are counted on `ctx.retry_count`.
pub(super) fn with_retry<T, F>(
    env: &JobEnv,
    policy: &RetryPolicy,
    ctx: &mut DownloadContext,
    target: &str,
    mut f: F,
) -> Attempt<T>
where
    F: FnMut(TransportMode) -> Result<T, FetchError>,
{
    let mut mode = TransportMode::Strict;
    let mut degraded_tried = false;
    loop {
        if !env.breaker.allow() {
            let decision = policy.decide(
                ErrorKind::Network,
                &AttemptState {
                    retry_count: ctx.retry_count,
                    degraded_tried,
                    breaker_open: true,
                },
            );
            return Attempt::Failed {
                error: FetchError::network(target, "circuit breaker open"),
                kind: ErrorKind::Network,
                decision,
            };
        }

        let error = match f(mode) {
            Ok(v) => {
                env.breaker.record_success();
                ctx.reset_retry();
                return Attempt::Done(v);
            }
            Err(e) => e,
        };

        let kind = classify(&error);
        if kind == ErrorKind::Network {
            env.breaker.record_failure();
        }
        let retry_count = ctx.record_failure();
        let decision = policy.decide(
            kind,
            &AttemptState {
                retry_count,
                degraded_tried,
                breaker_open: env.breaker.is_open(),
            },
        );
        if decision.action != FinalAction::Retry {
            return Attempt::Failed {
                error,
                kind,
                decision,
            };
        }

        tracing::warn!(
            job_id = ctx.job_id,
            target,
            attempt = retry_count,
            delay_ms = decision.delay.as_millis() as u64,
            "{}; retrying",
            error
        );
        if decision.degrade {
            mode = TransportMode::Degraded;
            degraded_tried = true;
        }
        if let Some(interrupt) = env.arbiter.sleep(ctx.job_id, decision.delay) {
            return Attempt::Interrupted(interrupt);
        }
    }
}
