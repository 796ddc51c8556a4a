//! `gdm restart <id> [--fresh]` – queue a gallery again.

use anyhow::Result;
use gdm_core::resume_db::ResumeDb;
use gdm_core::state::UrlStatus;

use crate::cli::control_socket::{self, ControlCommand, ControlReply};

pub async fn run_restart(db: &ResumeDb, id: i64, fresh: bool) -> Result<()> {
    match control_socket::send_default(ControlCommand::Restart { id, fresh }).await? {
        Some(ControlReply::Unknown) => {
            println!("No gallery with ID {id}");
            return Ok(());
        }
        Some(_) => {}
        None => {
            let Some(job) = db.get_job(id).await? else {
                println!("No gallery with ID {id}");
                return Ok(());
            };
            if fresh {
                db.clear_checkpoint(&job.url).await?;
            }
            db.set_status(id, UrlStatus::Pending, None).await?;
        }
    }
    if fresh {
        println!("Restarting gallery {id} from the first page");
    } else {
        println!("Restarting gallery {id}");
    }
    Ok(())
}
