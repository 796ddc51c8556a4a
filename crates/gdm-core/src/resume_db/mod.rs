//! Persistent queue and checkpoint database (SQLite via sqlx).
//!
//! Stores the URL queue with statuses and reasons, and one JSON checkpoint per
//! gallery URL. [`DbBridge`] exposes the database to the synchronous engine
//! through the [`CheckpointStore`](crate::checkpoint::CheckpointStore) and
//! [`StatusSink`](crate::state::StatusSink) traits.

mod bridge;
mod checkpoints;
mod db;
mod jobs;

pub use bridge::{load_state_store, DbBridge};
pub use db::{db_path, ResumeDb};
pub(crate) use db::unix_timestamp;
