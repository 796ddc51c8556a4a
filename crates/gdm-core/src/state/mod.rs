//! Queue entries, URL statuses and the store that guards them.

mod store;

pub use store::StateStore;

/// Queue entry identifier.
pub type JobId = i64;

/// Status of one gallery URL in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    Pending,
    Downloading,
    Completed,
    Skipped,
    Error,
    Incomplete,
    Paused,
}

impl UrlStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UrlStatus::Pending => "pending",
            UrlStatus::Downloading => "downloading",
            UrlStatus::Completed => "completed",
            UrlStatus::Skipped => "skipped",
            UrlStatus::Error => "error",
            UrlStatus::Incomplete => "incomplete",
            UrlStatus::Paused => "paused",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => UrlStatus::Pending,
            "downloading" => UrlStatus::Downloading,
            "completed" => UrlStatus::Completed,
            "skipped" => UrlStatus::Skipped,
            "incomplete" => UrlStatus::Incomplete,
            "paused" => UrlStatus::Paused,
            _ => UrlStatus::Error,
        }
    }

    /// Completed or skipped: not picked up again in this run.
    pub fn is_final(self) -> bool {
        matches!(self, UrlStatus::Completed | UrlStatus::Skipped)
    }
}

impl std::fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gallery in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: JobId,
    pub url: String,
    pub status: UrlStatus,
    /// Human-readable reason for the last non-pending status.
    pub reason: Option<String>,
}

/// Receives every status change made through the [`StateStore`], while the
/// store's lock is held.
pub trait StatusSink: Send {
    fn status_changed(&mut self, entry: &QueueEntry) -> anyhow::Result<()>;

    fn added(&mut self, _entry: &QueueEntry) -> anyhow::Result<()> {
        Ok(())
    }

    fn removed(&mut self, _id: JobId) -> anyhow::Result<()> {
        Ok(())
    }
}
