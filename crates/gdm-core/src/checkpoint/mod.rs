//! Resumable checkpoints.
//!
//! A checkpoint records where a gallery job stopped and why. It is written on
//! every interrupt and every per-image failure, and cleared when the job
//! completes or is restarted fresh.

mod model;
mod store;

pub use model::{CheckpointReason, JobStage, ResumeCheckpoint, StageData, SubStage};
pub use store::{CheckpointStore, MemoryCheckpointStore};
