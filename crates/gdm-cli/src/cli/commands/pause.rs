//! `gdm pause` – checkpoint the running gallery and pause the queue.

use anyhow::Result;

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_pause() -> Result<()> {
    match control_socket::send_default(ControlCommand::Pause).await? {
        Some(_) => println!("Pausing queue"),
        None => println!("No run in progress."),
    }
    Ok(())
}
