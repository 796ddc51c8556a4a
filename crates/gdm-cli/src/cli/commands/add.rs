//! `gdm add <url>...` – queue gallery URLs. A running `gdm run` takes them
//! into its live queue; otherwise they are written to the database.

use anyhow::{bail, Result};
use gdm_core::resume_db::ResumeDb;

use crate::cli::control_socket::{self, ControlCommand, ControlReply};

pub async fn run_add(db: &ResumeDb, urls: &[String]) -> Result<()> {
    for url in urls {
        if let Err(e) = url::Url::parse(url) {
            bail!("not a valid URL: {} ({})", url, e);
        }
    }
    for url in urls {
        let id = match control_socket::send_default(ControlCommand::Add(url.clone())).await? {
            Some(ControlReply::Added(id)) => id,
            Some(reply) => bail!("unexpected reply to add: {:?}", reply),
            None => db.add_job(url).await?,
        };
        println!("Added gallery {id}: {url}");
    }
    Ok(())
}
