use super::handle::{QueueHandle, RunControl};
use super::latch::CompletionLatch;
use super::{RunListener, RunState, RunSummary, SchedulerOptions};
use crate::job::{run_job, Directive, JobEnv, JobOutcome};
use crate::progress::ProgressPhase;
use crate::state::{QueueEntry, UrlStatus};
use crate::sync::lock;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How waiting on a worker ended.
enum WorkerEnd {
    Finished(JobOutcome),
    Panicked,
    /// Stop was requested and the worker did not return within the join timeout.
    Abandoned,
}

/// Runs the queue, one job at a time.
pub struct QueueScheduler {
    env: JobEnv,
    opts: SchedulerOptions,
    control: Arc<RunControl>,
    listener: Option<Arc<dyn RunListener>>,
    completion: CompletionLatch,
    /// Worker left behind by a stop that outlived the join timeout.
    abandoned: Mutex<Option<JoinHandle<()>>>,
}

impl QueueScheduler {
    pub fn new(env: JobEnv, opts: SchedulerOptions) -> Self {
        Self {
            env,
            opts,
            control: Arc::new(RunControl::default()),
            listener: None,
            completion: CompletionLatch::new(),
            abandoned: Mutex::new(None),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            state: Arc::clone(&self.env.state),
            arbiter: Arc::clone(&self.env.arbiter),
            gate: Arc::clone(&self.env.gate),
            control: Arc::clone(&self.control),
        }
    }

    pub fn env(&self) -> &JobEnv {
        &self.env
    }

    pub fn run_state(&self) -> RunState {
        self.control.state()
    }

    /// Processes pending URLs until the queue is exhausted, stopped, or
    /// paused with `exit_on_pause`. Blocks the calling thread.
    pub fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        self.completion.reset();
        self.reap_abandoned();
        self.env.arbiter.clear_stop();
        let reset = self.env.state.prepare_run();
        if reset > 0 {
            tracing::info!(count = reset, "re-queued interrupted galleries");
        }
        self.control.set_state(RunState::Running);
        tracing::info!(entries = self.env.state.len(), "run started");

        let mut position = 0;
        let final_state = loop {
            if self.env.arbiter.stop_requested() {
                break RunState::Stopped;
            }
            if self.env.arbiter.take_pause() {
                match self.pause_queue(Some("paused by user"), false) {
                    Some(state) => break state,
                    None => continue,
                }
            }
            let Some((pos, entry)) = self.env.state.next_pending(position) else {
                break RunState::Completed;
            };

            let outcome = self.run_worker(&entry, pos);
            summary.record(&outcome);
            if let Some(l) = &self.listener {
                l.job_finished(&outcome);
            }

            position = pos + 1;
            match outcome.directive {
                Directive::Continue => {}
                Directive::RerunJob => position = pos,
                Directive::StopRun => break RunState::Stopped,
                Directive::PauseQueue { auto_resume } => {
                    self.env.arbiter.take_pause();
                    position = pos;
                    if let Some(state) = self.pause_queue(outcome.reason.as_deref(), auto_resume) {
                        break state;
                    }
                }
            }
        };

        summary.final_state = final_state;
        match final_state {
            RunState::Completed => self.notify_run_complete(&summary),
            state => {
                self.control.set_state(state);
                tracing::info!(state = state.as_str(), "run ended");
            }
        }
        summary
    }

    /// Moves the run to `completed` and tells the listener, once per run.
    pub fn notify_run_complete(&self, summary: &RunSummary) {
        if !self.completion.fire() {
            return;
        }
        self.control.set_state(RunState::Completed);
        tracing::info!(
            completed = summary.completed,
            incomplete = summary.incomplete,
            skipped = summary.skipped,
            failed = summary.failed,
            "run completed"
        );
        if let Some(l) = &self.listener {
            l.run_complete(summary);
        }
    }

    /// Blocks until the queue is resumed. Returns the run's final state if the
    /// run should end instead.
    fn pause_queue(&self, reason: Option<&str>, auto_resume: bool) -> Option<RunState> {
        self.control.enter_pause();
        tracing::info!(reason = reason.unwrap_or(""), auto_resume, "queue paused");
        if let Some(l) = &self.listener {
            l.queue_paused(reason);
        }
        if self.opts.exit_on_pause {
            return Some(RunState::Paused);
        }

        let deadline = self
            .opts
            .auto_resume_delay
            .filter(|_| auto_resume)
            .map(|d| Instant::now() + d);
        let poll = self.opts.job.pause_poll;
        loop {
            if self.env.arbiter.stop_requested() {
                return Some(RunState::Stopped);
            }
            if self.control.wait_resume(poll) {
                break;
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                tracing::info!("auto-resuming queue");
                self.env.breaker.reset();
                break;
            }
        }

        self.env.arbiter.take_pause();
        let n = self.env.state.reactivate_paused();
        tracing::info!(requeued = n, "queue resumed");
        self.control.set_state(RunState::Running);
        if let Some(l) = &self.listener {
            l.queue_resumed();
        }
        None
    }

    fn run_worker(&self, entry: &QueueEntry, position: usize) -> JobOutcome {
        let id = entry.id;
        let env = self.env.clone();
        let mut opts = self.opts.job.clone();
        opts.range = opts.range.for_position(position);
        let job_entry = entry.clone();
        let (tx, rx) = mpsc::channel();

        self.env.arbiter.set_active(Some(id));
        if let Some(l) = &self.listener {
            l.job_started(entry);
        }
        let spawned = thread::Builder::new()
            .name(format!("gdm-job-{}", id))
            .spawn(move || {
                let outcome = run_job(&env, &opts, &job_entry);
                let _ = tx.send(outcome);
            });

        let outcome = match spawned {
            Ok(worker) => match self.await_worker(&rx) {
                WorkerEnd::Finished(outcome) => {
                    let _ = worker.join();
                    outcome
                }
                WorkerEnd::Panicked => {
                    let _ = worker.join();
                    tracing::error!(job_id = id, "worker panicked");
                    self.fail(id, "worker panicked", Directive::Continue)
                }
                WorkerEnd::Abandoned => {
                    tracing::warn!(
                        job_id = id,
                        timeout_secs = self.opts.worker_join_timeout.as_secs(),
                        "worker did not stop in time, detaching"
                    );
                    self.env.state.set_status(
                        id,
                        UrlStatus::Paused,
                        Some("stopped while busy".to_string()),
                    );
                    *lock(&self.abandoned) = Some(worker);
                    JobOutcome::new(id, UrlStatus::Paused, Directive::StopRun)
                        .because("stopped while busy")
                }
            },
            Err(e) => {
                tracing::error!(job_id = id, "failed to spawn worker: {}", e);
                self.fail(id, &format!("failed to spawn worker: {}", e), Directive::Continue)
            }
        };
        self.env.arbiter.set_active(None);
        outcome
    }

    /// Joins a worker detached by the previous run. The stop flag is still
    /// raised at this point, so the worker winds down on its next check.
    fn reap_abandoned(&self) {
        let Some(worker) = lock(&self.abandoned).take() else {
            return;
        };
        tracing::info!("waiting for detached worker to exit");
        if worker.join().is_err() {
            tracing::error!("detached worker panicked");
        }
    }

    fn await_worker(&self, rx: &Receiver<JobOutcome>) -> WorkerEnd {
        let poll = self.opts.job.pause_poll.max(Duration::from_millis(10));
        let mut stop_seen: Option<Instant> = None;
        loop {
            match rx.recv_timeout(poll) {
                Ok(outcome) => return WorkerEnd::Finished(outcome),
                Err(RecvTimeoutError::Disconnected) => return WorkerEnd::Panicked,
                Err(RecvTimeoutError::Timeout) => {
                    if !self.env.arbiter.stop_requested() {
                        continue;
                    }
                    let since = *stop_seen.get_or_insert_with(Instant::now);
                    if since.elapsed() >= self.opts.worker_join_timeout {
                        return WorkerEnd::Abandoned;
                    }
                }
            }
        }
    }

    fn fail(&self, id: i64, reason: &str, directive: Directive) -> JobOutcome {
        self.env
            .state
            .set_status(id, UrlStatus::Error, Some(reason.to_string()));
        if self.env.tracker.error(id, reason).is_none() {
            self.env
                .tracker
                .create(id, ProgressPhase::Error, 0, reason.to_string());
        }
        JobOutcome::new(id, UrlStatus::Error, directive).because(reason)
    }
}
