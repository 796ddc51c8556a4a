//! `gdm resume` – resume a paused queue.

use anyhow::Result;

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_resume() -> Result<()> {
    match control_socket::send_default(ControlCommand::Resume).await? {
        Some(_) => println!("Resuming queue"),
        None => println!("No run in progress; `gdm run` picks up paused galleries."),
    }
    Ok(())
}
