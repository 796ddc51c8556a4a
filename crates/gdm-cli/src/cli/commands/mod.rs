//! CLI command handlers, one per file.

mod add;
mod completions;
mod pause;
mod remove;
mod restart;
mod resume;
mod run;
mod skip;
mod status;
mod stop;

pub use add::run_add;
pub use completions::{run_completions, run_man};
pub use pause::run_pause;
pub use remove::run_remove;
pub use restart::run_restart;
pub use resume::run_resume;
pub use run::{run_scheduler, RunArgs};
pub use skip::run_skip;
pub use status::run_status;
pub use stop::run_stop;
