//! CLI for the GDM gallery download manager.

mod commands;
mod control_socket;
mod progress;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use gdm_core::config;
use gdm_core::resume_db::ResumeDb;
use std::path::PathBuf;

use commands::{
    run_add, run_completions, run_man, run_pause, run_remove, run_restart, run_resume,
    run_scheduler, run_skip, run_status, run_stop, RunArgs,
};

/// Top-level CLI for the GDM gallery download manager.
#[derive(Debug, Parser)]
#[command(name = "gdm")]
#[command(about = "GDM: resumable gallery download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue one or more gallery URLs.
    Add {
        /// Gallery manifest URLs (http, https or file).
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Process the queue until it is exhausted, stopped or paused.
    Run {
        /// Exit instead of waiting when the queue pauses.
        #[arg(long)]
        exit_on_pause: bool,
        /// Save galleries here instead of the configured download dir.
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },

    /// Show every queued gallery and its status.
    Status,

    /// Remove a gallery (and its checkpoint) from the queue.
    Remove {
        /// Queue entry ID.
        id: i64,
    },

    /// Skip a gallery. The running one is interrupted at the next page.
    Skip {
        /// Queue entry ID.
        id: i64,
    },

    /// Checkpoint the running gallery and pause the queue.
    Pause,

    /// Resume a paused queue.
    Resume,

    /// Checkpoint the running gallery and end the run.
    Stop,

    /// Queue a gallery again, resuming from its checkpoint unless --fresh.
    Restart {
        /// Queue entry ID.
        id: i64,
        /// Drop the checkpoint and start from the first page.
        #[arg(long)]
        fresh: bool,
    },

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => return run_completions(Cli::command(), shell),
            CliCommand::Man => return run_man(Cli::command()),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = ResumeDb::open_default().await?;

        match cli.command {
            CliCommand::Add { urls } => run_add(&db, &urls).await?,
            CliCommand::Run {
                exit_on_pause,
                download_dir,
            } => {
                let args = RunArgs {
                    exit_on_pause,
                    download_dir,
                };
                run_scheduler(&db, &cfg, args).await?;
            }
            CliCommand::Status => run_status(&db).await?,
            CliCommand::Remove { id } => run_remove(&db, id).await?,
            CliCommand::Skip { id } => run_skip(&db, id).await?,
            CliCommand::Pause => run_pause().await?,
            CliCommand::Resume => run_resume().await?,
            CliCommand::Stop => run_stop().await?,
            CliCommand::Restart { id, fresh } => run_restart(&db, id, fresh).await?,
            CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
