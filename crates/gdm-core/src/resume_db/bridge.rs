//! Blocking adapter from the synchronous engine to the async database.

use anyhow::Result;
use tokio::runtime::Handle;

use super::db::ResumeDb;
use crate::checkpoint::{CheckpointStore, ResumeCheckpoint};
use crate::state::{JobId, QueueEntry, StateStore, StatusSink};

/// Implements [`CheckpointStore`] and [`StatusSink`] on top of [`ResumeDb`].
///
/// Every call blocks on the runtime behind `handle`, so it must only be used
/// from plain threads (job workers, `spawn_blocking`), never from async tasks.
#[derive(Clone)]
pub struct DbBridge {
    db: ResumeDb,
    handle: Handle,
}

impl DbBridge {
    pub fn new(db: ResumeDb, handle: Handle) -> Self {
        Self { db, handle }
    }
}

impl CheckpointStore for DbBridge {
    fn get(&self, url: &str) -> Result<Option<ResumeCheckpoint>> {
        self.handle.block_on(self.db.get_checkpoint(url))
    }

    fn set(&mut self, _url: &str, checkpoint: &ResumeCheckpoint) -> Result<()> {
        self.handle.block_on(self.db.set_checkpoint(checkpoint))
    }

    fn clear(&mut self, url: &str) -> Result<()> {
        self.handle.block_on(self.db.clear_checkpoint(url))
    }

    fn all(&self) -> Result<Vec<ResumeCheckpoint>> {
        self.handle.block_on(self.db.list_checkpoints())
    }
}

impl StatusSink for DbBridge {
    fn status_changed(&mut self, entry: &QueueEntry) -> Result<()> {
        self.handle
            .block_on(
                self.db
                    .set_status(entry.id, entry.status, entry.reason.as_deref()),
            )
            .map(|_| ())
    }

    fn added(&mut self, entry: &QueueEntry) -> Result<()> {
        self.handle.block_on(self.db.insert_job(entry))
    }

    fn removed(&mut self, id: JobId) -> Result<()> {
        self.handle.block_on(self.db.remove_job(id)).map(|_| ())
    }
}

/// Builds a [`StateStore`] holding the database's queue, with checkpoints and
/// status changes persisted back through a [`DbBridge`].
pub async fn load_state_store(db: &ResumeDb) -> Result<StateStore> {
    let entries = db.list_jobs().await?;
    let bridge = DbBridge::new(db.clone(), Handle::current());
    let store = StateStore::new(Box::new(bridge.clone())).with_sink(Box::new(bridge));
    for entry in entries {
        store.insert(entry);
    }
    Ok(store)
}
