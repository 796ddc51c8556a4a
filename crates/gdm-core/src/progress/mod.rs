//! Observable per-job progress.
//!
//! [`ProgressTracker`] keeps one immutable [`ProgressSnapshot`] per job and
//! replaces it wholesale on every change. Observers are called after the
//! tracker's lock is released, so an observer may query the tracker again.

mod snapshot;
mod throttle;
mod tracker;

pub use snapshot::{ProgressPhase, ProgressSnapshot, ProgressUpdate};
pub use throttle::ThrottledObserver;
pub use tracker::{ProgressObserver, ProgressTracker};
