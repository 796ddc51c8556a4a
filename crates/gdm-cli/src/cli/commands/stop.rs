//! `gdm stop` – checkpoint the running gallery and end the run.

use anyhow::Result;

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_stop() -> Result<()> {
    match control_socket::send_default(ControlCommand::Stop).await? {
        Some(_) => println!("Stopping run"),
        None => println!("No run in progress."),
    }
    Ok(())
}
