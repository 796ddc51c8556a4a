//! `gdm status` – show every queued gallery.

use anyhow::Result;
use gdm_core::resume_db::ResumeDb;

pub async fn run_status(db: &ResumeDb) -> Result<()> {
    let jobs = db.list_jobs().await?;
    if jobs.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }
    println!("{:<6} {:<12} {:<8} {}", "ID", "STATUS", "RESUME", "URL");
    for j in jobs {
        let resume = match db.get_checkpoint(&j.url).await? {
            Some(cp) => format!("p{}", cp.resume_page()),
            None => "-".to_string(),
        };
        println!("{:<6} {:<12} {:<8} {}", j.id, j.status, resume, j.url);
        if let Some(reason) = j.reason.as_deref().filter(|r| !r.is_empty()) {
            println!("{:<6} {}", "", reason);
        }
    }
    Ok(())
}
