//! Console output for a running queue.

use gdm_core::job::JobOutcome;
use gdm_core::progress::{ProgressObserver, ProgressSnapshot};
use gdm_core::scheduler::{RunListener, RunSummary};
use gdm_core::state::QueueEntry;

/// Prints one line per (throttled) progress snapshot.
pub struct ProgressPrinter;

impl ProgressObserver for ProgressPrinter {
    fn on_progress(&self, snap: &ProgressSnapshot) {
        let title = snap.metadata.get("title").map(String::as_str).unwrap_or("");
        println!(
            "  [{}] {:<17} {}/{} ({:.0}%) {} {}",
            snap.job_id,
            snap.phase.as_str(),
            snap.current,
            snap.total,
            snap.percent(),
            title,
            snap.status
        );
    }
}

/// Prints run-level events.
pub struct ConsoleListener;

impl RunListener for ConsoleListener {
    fn job_started(&self, entry: &QueueEntry) {
        println!("[{}] {}", entry.id, entry.url);
    }

    fn job_finished(&self, outcome: &JobOutcome) {
        match &outcome.reason {
            Some(reason) => println!("[{}] {}: {}", outcome.job_id, outcome.status, reason),
            None => println!("[{}] {}", outcome.job_id, outcome.status),
        }
    }

    fn queue_paused(&self, reason: Option<&str>) {
        match reason {
            Some(r) => println!("Queue paused ({}). Use `gdm resume` to continue.", r),
            None => println!("Queue paused. Use `gdm resume` to continue."),
        }
    }

    fn queue_resumed(&self) {
        println!("Queue resumed.");
    }

    fn run_complete(&self, summary: &RunSummary) {
        println!(
            "Run complete: {} completed, {} incomplete, {} skipped, {} failed.",
            summary.completed, summary.incomplete, summary.skipped, summary.failed
        );
    }
}
