//! `gdm skip <id>` – skip a gallery. A running `gdm run` interrupts it;
//! otherwise the queue entry is marked skipped directly.

use anyhow::Result;
use gdm_core::resume_db::ResumeDb;
use gdm_core::state::UrlStatus;

use crate::cli::control_socket::{self, ControlCommand, ControlReply};

pub async fn run_skip(db: &ResumeDb, id: i64) -> Result<()> {
    match control_socket::send_default(ControlCommand::Skip(id)).await? {
        Some(ControlReply::Unknown) => println!("No gallery with ID {id}"),
        Some(_) => println!("Skipping gallery {id}"),
        None => {
            let Some(job) = db.get_job(id).await? else {
                println!("No gallery with ID {id}");
                return Ok(());
            };
            db.clear_checkpoint(&job.url).await?;
            db.set_status(id, UrlStatus::Skipped, Some("skipped by user"))
                .await?;
            println!("Skipped gallery {id}");
        }
    }
    Ok(())
}
