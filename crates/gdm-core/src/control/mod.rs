//! Interrupt requests and the cooperative pause gate.
//!
//! User requests (skip, restart, pause, stop) are recorded as flags in the
//! [`InterruptArbiter`]; the running job polls them at loop boundaries and
//! resolves competing requests in a fixed priority. The [`PauseGate`] holds the
//! worker in place without ending the job.

mod arbiter;
mod gate;

pub use arbiter::{Interrupt, InterruptArbiter, RestartMode};
pub use gate::PauseGate;

use std::path::PathBuf;

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("gdm")?.get_state_home();
    Ok(dir.join("control.sock"))
}
