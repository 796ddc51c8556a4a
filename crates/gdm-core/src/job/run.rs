use super::attempt::{with_retry, Attempt};
use super::{Directive, JobEnv, JobOptions, JobOutcome};
use crate::checkpoint::{CheckpointReason, JobStage, ResumeCheckpoint};
use crate::context::DownloadContext;
use crate::control::{Interrupt, RestartMode};
use crate::fetch::{FetchError, GalleryInfo, SaveOutcome};
use crate::naming::{gallery_folder_name, page_filename};
use crate::progress::{ProgressPhase, ProgressUpdate};
use crate::range::{self, DownloadRange, RangeResolution};
use crate::retry::{classify, AttemptState, ErrorKind, FinalAction};
use crate::state::{QueueEntry, UrlStatus};
use std::path::Path;

/// Early exit from the loop, carrying the job's final outcome.
type Step<T> = Result<T, JobOutcome>;

/// Runs one gallery job to a terminal state on the calling thread.
pub fn run_job(env: &JobEnv, opts: &JobOptions, entry: &QueueEntry) -> JobOutcome {
    let mut job = JobLoop {
        env,
        opts,
        ctx: DownloadContext::new(entry.id, entry.url.clone()),
    };
    let outcome = match job.download() {
        Ok(()) => job.finish(),
        Err(outcome) => outcome,
    };
    env.arbiter.forget(entry.id);
    tracing::info!(
        job_id = entry.id,
        status = %outcome.status,
        reason = outcome.reason.as_deref().unwrap_or(""),
        "job finished"
    );
    outcome
}

struct JobLoop<'a> {
    env: &'a JobEnv,
    opts: &'a JobOptions,
    ctx: DownloadContext,
}

impl JobLoop<'_> {
    fn id(&self) -> i64 {
        self.ctx.job_id
    }

    fn download(&mut self) -> Step<()> {
        let id = self.id();
        self.env.state.set_status(id, UrlStatus::Downloading, None);
        self.env
            .tracker
            .create(id, ProgressPhase::UrlFetching, 0, "fetching gallery");
        tracing::info!(job_id = id, url = %self.ctx.url, "job started");

        self.check_interrupt()?;
        self.ctx.stage = JobStage::FetchingMetadata;
        let checkpoint = self.load_checkpoint();
        let gallery = self.fetch_gallery()?;
        self.prepare_folder(&gallery, checkpoint.as_ref())?;
        let resolution = self.resolve(&gallery, checkpoint.as_ref())?;

        self.ctx.stage = JobStage::DownloadingPages;
        self.env.tracker.update(
            id,
            ProgressUpdate::new()
                .phase(ProgressPhase::ImageDownloading)
                .total(self.ctx.total_pages)
                .current(self.ctx.start_page - 1)
                .status(if self.ctx.is_resume { "resuming" } else { "downloading" })
                .meta("title", self.ctx.title.clone())
                .meta("folder", self.ctx.save_folder.display().to_string()),
        );

        for page in self.ctx.backfill_pages() {
            if let Some(url) = resolution.window.get(page - 1) {
                tracing::debug!(job_id = id, page, "retrying earlier gap");
                self.page(page, url)?;
            }
        }

        let pending: Vec<(usize, String)> = resolution
            .pending()
            .map(|(p, u)| (p, u.to_string()))
            .collect();
        let last = pending.last().map(|(p, _)| *p);
        for (page, url) in pending {
            self.check_interrupt()?;
            self.ctx.begin_page(page);
            self.page(page, &url)?;
            if Some(page) != last && !self.opts.page_wait.is_zero() {
                if let Some(i) = self.env.arbiter.sleep(id, self.opts.page_wait) {
                    return Err(self.interrupted(i));
                }
            }
        }
        Ok(())
    }

    fn load_checkpoint(&self) -> Option<ResumeCheckpoint> {
        match self.env.state.checkpoint(&self.ctx.url) {
            Ok(Some(cp)) if !cp.folder.as_os_str().is_empty() => Some(cp),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(job_id = self.id(), "failed to read checkpoint: {:#}", e);
                None
            }
        }
    }

    fn fetch_gallery(&mut self) -> Step<GalleryInfo> {
        let env = self.env;
        let url = self.ctx.url.clone();
        let result = with_retry(env, &self.opts.policy, &mut self.ctx, &url, |_| {
            env.fetcher.fetch_gallery(&url)
        });
        let gallery = match result {
            Attempt::Done(g) => g,
            Attempt::Interrupted(i) => return Err(self.interrupted(i)),
            Attempt::Failed {
                error,
                kind,
                decision,
            } => return Err(self.job_failed(error, kind, decision.action)),
        };
        if gallery.page_urls.is_empty() {
            return Err(self.fail_with(FetchError::parse(&url, "gallery lists no pages")));
        }
        if gallery.total_pages > gallery.page_urls.len() {
            tracing::warn!(
                job_id = self.id(),
                reported = gallery.total_pages,
                listed = gallery.page_urls.len(),
                "gallery lists fewer pages than it reports"
            );
        }
        self.ctx.title = gallery.title.clone();
        Ok(gallery)
    }

    fn prepare_folder(&mut self, gallery: &GalleryInfo, cp: Option<&ResumeCheckpoint>) -> Step<()> {
        if let Some(cp) = cp {
            if !self.env.store.path_exists(&cp.folder) {
                return Err(self.fail_with(FetchError::FolderMissing {
                    path: cp.folder.clone(),
                }));
            }
            self.ctx.restore_from(cp);
            tracing::info!(
                job_id = self.id(),
                page = self.ctx.start_page,
                folder = %cp.folder.display(),
                "resuming from checkpoint"
            );
            return Ok(());
        }
        let folder = self
            .opts
            .download_dir
            .join(gallery_folder_name(&gallery.title, &self.ctx.url));
        if let Err(e) = self.env.store.ensure_folder(&folder) {
            return Err(self.fail_with(e));
        }
        self.ctx.save_folder = folder;
        Ok(())
    }

    fn resolve(
        &mut self,
        gallery: &GalleryInfo,
        cp: Option<&ResumeCheckpoint>,
    ) -> Step<RangeResolution> {
        let mut resolution = match range::apply(&gallery.page_urls, 1, &self.opts.range) {
            Ok(r) => r,
            Err(e) => return Err(self.fail_with(FetchError::RangeInvalid(e.to_string()))),
        };
        for w in &resolution.warnings {
            tracing::warn!(job_id = self.id(), "{}", w);
        }

        let mut start_page = cp.map_or(1, |c| c.resume_page());
        if let Some(old) = cp.and_then(|c| c.download_range) {
            if resolution.range.differs_from(&old) {
                let new = resolution.range;
                let abs = old.absolute(start_page);
                start_page = match new.relative_for(abs) {
                    Some(rel) => rel,
                    None if abs < new.start.unwrap_or(1) => 1,
                    None => resolution.total() + 1,
                };
                self.ctx.skipped_pages = remap(&self.ctx.skipped_pages, &old, &new);
                self.ctx.failed_pages = remap(&self.ctx.failed_pages, &old, &new);
                // The window grew backward: queue the new leading pages for backfill.
                for rel in leading_pages(&old, &new, start_page) {
                    if !self.ctx.skipped_pages.contains(&rel)
                        && !self.ctx.failed_pages.contains(&rel)
                    {
                        self.ctx.failed_pages.push(rel);
                    }
                }
                resolution.range.range_changed = true;
                tracing::info!(
                    job_id = self.id(),
                    absolute_page = abs,
                    page = start_page,
                    "configured range changed since checkpoint, remapped resume page"
                );
            }
        }

        resolution.start_page = start_page;
        self.ctx.download_range = resolution.range;
        self.ctx.start_page = start_page;
        self.ctx.current_page = start_page;
        self.ctx.total_pages = resolution.total();
        Ok(resolution)
    }

    fn page(&mut self, page: usize, url: &str) -> Step<()> {
        self.wait_gate()?;
        let env = self.env;
        let abs = self.ctx.absolute_page(page);
        let folder = self.ctx.save_folder.clone();
        let result = with_retry(env, &self.opts.policy, &mut self.ctx, url, |mode| {
            let info = env.fetcher.fetch_image_info(url)?;
            let path = folder.join(page_filename(abs, &info.filename));
            if env.store.path_exists(&path) {
                return Ok(path);
            }
            let bytes = env.fetcher.fetch_image(&info.image_url, mode)?;
            match env.store.save(&bytes, &path)? {
                SaveOutcome::Saved(p) => Ok(p),
                SaveOutcome::Skipped => Ok(path),
            }
        });
        match result {
            Attempt::Done(path) => {
                self.page_saved(page, abs, &path);
                Ok(())
            }
            Attempt::Interrupted(i) => Err(self.interrupted(i)),
            Attempt::Failed {
                error,
                kind,
                decision,
            } => self.page_failed(page, abs, error, kind, decision.action),
        }
    }

    fn page_saved(&mut self, page: usize, abs: usize, path: &Path) {
        let id = self.id();
        self.ctx.mark_page_saved(page, path);
        if let Err(e) = self.env.store.remove_placeholder(&self.ctx.save_folder, abs) {
            tracing::debug!(job_id = id, page, "could not remove placeholder: {}", e);
        }
        if let Err(e) = self.env.post.on_page_saved(path) {
            tracing::warn!(job_id = id, page, "post-processing failed: {:#}", e);
        }
        tracing::debug!(job_id = id, page, absolute_page = abs, path = %path.display(), "page saved");
        self.env.tracker.update(
            id,
            ProgressUpdate::new()
                .current(self.ctx.current_page)
                .status(format!("page {}/{}", self.ctx.current_page, self.ctx.total_pages)),
        );
    }

    fn page_failed(
        &mut self,
        page: usize,
        abs: usize,
        error: FetchError,
        kind: ErrorKind,
        action: FinalAction,
    ) -> Step<()> {
        let id = self.id();
        let reason = error.to_string();
        match action {
            FinalAction::SkipImage | FinalAction::Retry => {
                tracing::warn!(job_id = id, page, absolute_page = abs, "giving up on image: {}", reason);
                if let Err(e) = self
                    .env
                    .store
                    .write_placeholder(&self.ctx.save_folder, abs, &reason)
                {
                    tracing::warn!(job_id = id, page, "could not write placeholder: {}", e);
                }
                self.ctx.add_skipped_page(page);
                self.ctx.retry_count = 0;
                self.save_checkpoint(CheckpointReason::ImageFailed);
                if let Some(limit) = self.opts.skip_url_after_skipped_images {
                    let skipped = self.ctx.skipped_pages.len();
                    if limit > 0 && skipped >= limit {
                        return Err(self.skip_url(
                            format!("{} images skipped, giving up on gallery", skipped),
                            CheckpointReason::ImageFailed,
                        ));
                    }
                }
                Ok(())
            }
            FinalAction::Continue => {
                tracing::warn!(job_id = id, page, absolute_page = abs, "dropping image: {}", reason);
                self.ctx.add_failed_page(page);
                self.ctx.retry_count = 0;
                self.save_checkpoint(CheckpointReason::ImageFailed);
                Ok(())
            }
            _ => Err(self.job_failed(error, kind, action)),
        }
    }

    /// Classifies a job-level failure and ends the job accordingly.
    fn fail_with(&mut self, error: FetchError) -> JobOutcome {
        let kind = classify(&error);
        let decision = self.opts.policy.decide(
            kind,
            &AttemptState {
                retry_count: self.opts.policy.max_retry_count,
                degraded_tried: true,
                breaker_open: false,
            },
        );
        self.job_failed(error, kind, decision.action)
    }

    fn job_failed(&mut self, error: FetchError, kind: ErrorKind, action: FinalAction) -> JobOutcome {
        let reason = error.to_string();
        match action {
            FinalAction::SkipUrl => {
                let cp_reason = if kind == ErrorKind::FolderMissing {
                    CheckpointReason::FolderMissing
                } else {
                    CheckpointReason::JobError
                };
                self.skip_url(reason, cp_reason)
            }
            FinalAction::Pause => self.pause_on_error(kind, reason),
            _ => self.abort(reason),
        }
    }

    fn skip_url(&mut self, reason: String, cp_reason: CheckpointReason) -> JobOutcome {
        let id = self.id();
        tracing::warn!(job_id = id, "skipping gallery: {}", reason);
        self.ctx.stage = JobStage::Skipped;
        self.settle(UrlStatus::Skipped, &reason, cp_reason);
        self.env.tracker.error(id, reason.clone());
        JobOutcome::new(id, UrlStatus::Skipped, Directive::Continue).because(reason)
    }

    fn pause_on_error(&mut self, kind: ErrorKind, reason: String) -> JobOutcome {
        let id = self.id();
        let (status, cp_reason) = if kind == ErrorKind::RangeInvalid {
            (UrlStatus::Incomplete, CheckpointReason::ConfigError)
        } else {
            (UrlStatus::Paused, CheckpointReason::JobError)
        };
        tracing::warn!(job_id = id, "pausing queue: {}", reason);
        self.ctx.stage = if status == UrlStatus::Incomplete {
            JobStage::Incomplete
        } else {
            JobStage::Paused
        };
        self.settle(status, &reason, cp_reason);
        self.env.tracker.update(
            id,
            ProgressUpdate::new()
                .phase(ProgressPhase::Paused)
                .status(reason.clone()),
        );
        JobOutcome::new(
            id,
            status,
            Directive::PauseQueue {
                auto_resume: kind == ErrorKind::Network,
            },
        )
        .because(reason)
    }

    fn abort(&mut self, reason: String) -> JobOutcome {
        let id = self.id();
        tracing::error!(job_id = id, "job failed: {}", reason);
        self.ctx.stage = JobStage::Error;
        self.settle(UrlStatus::Error, &reason, CheckpointReason::JobError);
        self.env.tracker.error(id, reason.clone());
        JobOutcome::new(id, UrlStatus::Error, Directive::Continue).because(reason)
    }

    fn check_interrupt(&mut self) -> Step<()> {
        match self.env.arbiter.check(self.id()) {
            Some(i) => Err(self.interrupted(i)),
            None => Ok(()),
        }
    }

    fn wait_gate(&mut self) -> Step<()> {
        if !self.env.gate.is_held() {
            return Ok(());
        }
        let id = self.id();
        self.env.tracker.update(
            id,
            ProgressUpdate::new()
                .phase(ProgressPhase::Paused)
                .status("on hold"),
        );
        let env = self.env;
        while !env
            .gate
            .wait_while_held(self.opts.pause_poll, || env.arbiter.check(id).is_some())
        {
            self.check_interrupt()?;
        }
        self.env.tracker.update(
            id,
            ProgressUpdate::new()
                .phase(ProgressPhase::ImageDownloading)
                .status("downloading"),
        );
        Ok(())
    }

    fn interrupted(&mut self, interrupt: Interrupt) -> JobOutcome {
        let id = self.id();
        tracing::info!(job_id = id, ?interrupt, page = self.ctx.current_page, "job interrupted");
        match interrupt {
            Interrupt::Skip => {
                self.env.arbiter.take_skip(id);
                self.ctx.stage = JobStage::Skipped;
                let reason = "skipped by user";
                if let Err(e) = self.env.state.skip(id, Some(reason.to_string())) {
                    tracing::warn!(job_id = id, "failed to clear checkpoint on skip: {:#}", e);
                    self.env.state.set_status(id, UrlStatus::Skipped, Some(reason.to_string()));
                }
                self.env.tracker.complete(id, reason);
                JobOutcome::new(id, UrlStatus::Skipped, Directive::Continue).because(reason)
            }
            Interrupt::Restart(mode) => {
                self.env.arbiter.take_restart(id);
                match mode {
                    RestartMode::Fresh => {
                        if let Err(e) = self.env.state.clear_checkpoint(&self.ctx.url) {
                            tracing::warn!(job_id = id, "failed to clear checkpoint: {:#}", e);
                        }
                    }
                    RestartMode::Resume => self.save_checkpoint(CheckpointReason::Restart),
                }
                self.env.state.set_status(id, UrlStatus::Pending, None);
                self.env.tracker.remove(id);
                JobOutcome::new(id, UrlStatus::Pending, Directive::RerunJob)
                    .because(CheckpointReason::Restart.to_string())
            }
            Interrupt::Pause => {
                self.ctx.stage = JobStage::Paused;
                let reason = CheckpointReason::UserPause;
                self.settle(UrlStatus::Paused, &reason.to_string(), reason);
                self.env.tracker.update(
                    id,
                    ProgressUpdate::new()
                        .phase(ProgressPhase::Paused)
                        .status(reason.to_string()),
                );
                JobOutcome::new(
                    id,
                    UrlStatus::Paused,
                    Directive::PauseQueue { auto_resume: false },
                )
                .because(reason.to_string())
            }
            Interrupt::Stop => {
                self.ctx.stage = JobStage::Paused;
                let reason = CheckpointReason::UserStop;
                self.settle(UrlStatus::Paused, &reason.to_string(), reason);
                self.env.tracker.update(
                    id,
                    ProgressUpdate::new()
                        .phase(ProgressPhase::Paused)
                        .status(reason.to_string()),
                );
                JobOutcome::new(id, UrlStatus::Paused, Directive::StopRun)
                    .because(reason.to_string())
            }
        }
    }

    fn finish(&mut self) -> JobOutcome {
        let id = self.id();
        if self.ctx.has_gaps() {
            self.ctx.stage = JobStage::Incomplete;
            let reason = format!(
                "{} page(s) skipped, {} failed",
                self.ctx.skipped_pages.len(),
                self.ctx.failed_pages.len()
            );
            self.settle(UrlStatus::Incomplete, &reason, CheckpointReason::ImageFailed);
            self.env.tracker.complete(id, reason.clone());
            return JobOutcome::new(id, UrlStatus::Incomplete, Directive::Continue).because(reason);
        }

        self.ctx.stage = JobStage::Completed;
        if let Err(e) = self.env.state.complete(id) {
            tracing::warn!(job_id = id, "failed to clear checkpoint: {:#}", e);
            self.env.state.set_status(id, UrlStatus::Completed, None);
        }
        self.env.tracker.complete(id, "completed");
        if let Err(e) = self.env.post.on_job_complete(&self.ctx.save_folder) {
            tracing::warn!(job_id = id, "post-processing failed: {:#}", e);
        }
        JobOutcome::new(id, UrlStatus::Completed, Directive::Continue)
    }

    /// Checkpoints are only meaningful once the save folder is known.
    fn checkpointable(&self) -> bool {
        !self.ctx.save_folder.as_os_str().is_empty()
    }

    fn save_checkpoint(&self, reason: CheckpointReason) {
        if !self.checkpointable() {
            return;
        }
        if let Err(e) = self.env.state.save_checkpoint(&self.ctx.to_checkpoint(reason)) {
            tracing::warn!(job_id = self.id(), "failed to save checkpoint: {:#}", e);
        }
    }

    /// Sets the final status, writing a checkpoint alongside when possible.
    fn settle(&self, status: UrlStatus, reason: &str, cp_reason: CheckpointReason) {
        let id = self.id();
        if self.checkpointable() {
            let cp = self.ctx.to_checkpoint(cp_reason);
            match self
                .env
                .state
                .save_with_status(id, &cp, status, Some(reason.to_string()))
            {
                Ok(()) => return,
                Err(e) => tracing::warn!(job_id = id, "failed to save checkpoint: {:#}", e),
            }
        }
        self.env.state.set_status(id, status, Some(reason.to_string()));
    }
}

fn remap(pages: &[usize], old: &DownloadRange, new: &DownloadRange) -> Vec<usize> {
    pages
        .iter()
        .filter_map(|p| new.relative_for(old.absolute(*p)))
        .collect()
}

/// Relative pages of `new` that lie before the first page of `old` and before
/// `resume_page`.
fn leading_pages(old: &DownloadRange, new: &DownloadRange, resume_page: usize) -> Vec<usize> {
    let old_first = old.absolute(1);
    (new.absolute(1)..old_first)
        .filter_map(|abs| new.relative_for(abs))
        .filter(|rel| *rel < resume_page)
        .collect()
}
