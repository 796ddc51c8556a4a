pub mod config;
pub mod logging;

pub mod checkpoint;
pub mod context;
pub mod control;
pub mod fetch;
pub mod job;
pub mod naming;
pub mod progress;
pub mod range;
pub mod resume_db;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod transport;

mod sync;
