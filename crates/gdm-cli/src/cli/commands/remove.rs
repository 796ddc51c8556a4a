//! `gdm remove <id>` – drop a gallery and its checkpoint from the queue.

use anyhow::Result;
use gdm_core::resume_db::ResumeDb;

use crate::cli::control_socket::{self, ControlCommand, ControlReply};

pub async fn run_remove(db: &ResumeDb, id: i64) -> Result<()> {
    let removed = match control_socket::send_default(ControlCommand::Remove(id)).await? {
        Some(reply) => reply == ControlReply::Done,
        None => db.remove_job(id).await?,
    };
    if removed {
        println!("Removed gallery {id}");
    } else {
        println!("No gallery with ID {id}");
    }
    Ok(())
}
