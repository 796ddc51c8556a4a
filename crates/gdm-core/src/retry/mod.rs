//! Failure classification, retry decisions and the circuit breaker.
//!
//! The job loop never matches on [`crate::fetch::FetchError`] directly: it
//! classifies the error into an [`ErrorKind`], asks the [`RetryPolicy`] what to
//! do, and acts on the returned [`FinalAction`]. Decisions are values, never
//! panics or error propagation.

mod breaker;
mod classify;
mod policy;

pub use breaker::{BreakerState, CircuitBreaker};
pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{AttemptState, Decision, ErrorKind, FinalAction, RetryLimitAction, RetryPolicy};
