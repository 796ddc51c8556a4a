use super::model::ResumeCheckpoint;
use anyhow::Result;
use std::collections::HashMap;

/// Persistence boundary for checkpoints, keyed by gallery URL.
///
/// Implementations are only reached through [`crate::state::StateStore`],
/// which serializes access.
pub trait CheckpointStore: Send {
    fn get(&self, url: &str) -> Result<Option<ResumeCheckpoint>>;

    fn set(&mut self, url: &str, checkpoint: &ResumeCheckpoint) -> Result<()>;

    fn clear(&mut self, url: &str) -> Result<()>;

    fn all(&self) -> Result<Vec<ResumeCheckpoint>>;
}

/// Checkpoints held in memory only; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    entries: HashMap<String, ResumeCheckpoint>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, url: &str) -> Result<Option<ResumeCheckpoint>> {
        Ok(self.entries.get(url).cloned())
    }

    fn set(&mut self, url: &str, checkpoint: &ResumeCheckpoint) -> Result<()> {
        self.entries.insert(url.to_string(), checkpoint.clone());
        Ok(())
    }

    fn clear(&mut self, url: &str) -> Result<()> {
        self.entries.remove(url);
        Ok(())
    }

    fn all(&self) -> Result<Vec<ResumeCheckpoint>> {
        let mut v: Vec<_> = self.entries.values().cloned().collect();
        v.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(v)
    }
}
