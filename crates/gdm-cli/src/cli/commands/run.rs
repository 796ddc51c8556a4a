//! `gdm run` – process the queue.

use anyhow::{Context, Result};
use gdm_core::config::GdmConfig;
use gdm_core::job::JobEnv;
use gdm_core::progress::ThrottledObserver;
use gdm_core::resume_db::{load_state_store, ResumeDb};
use gdm_core::scheduler::{QueueScheduler, RunState, SchedulerOptions};
use gdm_core::storage::FsImageStore;
use gdm_core::transport::ManifestFetcher;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::control_socket;
use crate::cli::progress::{ConsoleListener, ProgressPrinter};

#[derive(Debug, Default)]
pub struct RunArgs {
    pub exit_on_pause: bool,
    pub download_dir: Option<PathBuf>,
}

pub async fn run_scheduler(db: &ResumeDb, cfg: &GdmConfig, args: RunArgs) -> Result<()> {
    let recovered = db.recover_downloading_jobs().await?;
    if recovered > 0 {
        tracing::info!("recovered {} gallery(ies) from previous run", recovered);
    }
    let state = load_state_store(db).await?;
    if state.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    let env = JobEnv::new(
        Arc::new(ManifestFetcher::new()),
        Arc::new(FsImageStore::new()),
        Arc::new(state),
    )
    .with_breaker(cfg.retry.breaker());
    env.tracker.subscribe(Arc::new(ThrottledObserver::new(
        Arc::new(ProgressPrinter),
        Duration::from_millis(cfg.progress_throttle_ms),
    )));

    let mut opts = SchedulerOptions::from_config(cfg);
    opts.exit_on_pause = args.exit_on_pause;
    if let Some(dir) = args.download_dir {
        opts.job.download_dir = dir;
    }
    tracing::debug!(dir = %opts.job.download_dir.display(), "download dir");

    let scheduler = QueueScheduler::new(env, opts).with_listener(Arc::new(ConsoleListener));
    let handle = scheduler.handle();

    let socket_path = gdm_core::control::default_control_socket_path().ok();
    let listener = match &socket_path {
        Some(path) => match control_socket::spawn_control_listener(handle.clone(), path) {
            Ok(task) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(task)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket unavailable: {:#}", e);
                None
            }
        },
        None => None,
    };

    let interrupt = {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("Stopping after the current page...");
                handle.stop();
            }
        })
    };

    let summary = tokio::task::spawn_blocking(move || scheduler.run())
        .await
        .context("scheduler thread panicked")?;

    interrupt.abort();
    if let Some(task) = listener {
        task.abort();
    }
    if let Some(path) = socket_path {
        let _ = std::fs::remove_file(path);
    }

    match summary.final_state {
        RunState::Completed => {}
        RunState::Paused => println!("Queue paused; run `gdm run` again to continue."),
        RunState::Stopped => println!("Run stopped; progress is checkpointed."),
        RunState::Idle | RunState::Running => {}
    }
    tracing::info!(
        state = summary.final_state.as_str(),
        completed = summary.completed,
        "run finished"
    );
    Ok(())
}
