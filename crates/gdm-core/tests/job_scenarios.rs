//! End-to-end job runs against an in-memory gallery and a real download folder.

mod common;

use common::fake_gallery::FakeGallery;
use common::{env, files_in, job_options};
use gdm_core::checkpoint::{CheckpointReason, JobStage, ResumeCheckpoint, StageData, SubStage};
use gdm_core::control::RestartMode;
use gdm_core::fetch::FetchError;
use gdm_core::job::{run_job, Directive, JobEnv, JobOptions};
use gdm_core::progress::ProgressPhase;
use gdm_core::range::RangeConfig;
use gdm_core::retry::CircuitBreaker;
use gdm_core::state::{JobId, UrlStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const URL: &str = "https://g.example/g/1";

fn run(env: &JobEnv, opts: &JobOptions, id: JobId) -> gdm_core::job::JobOutcome {
    let entry = env.state.entry(id).unwrap();
    run_job(env, opts, &entry)
}

/// The single gallery folder created under `dir`.
fn gallery_dir(dir: &Path) -> PathBuf {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    assert_eq!(dirs.len(), 1, "expected one gallery folder in {}", dir.display());
    dirs.remove(0)
}

fn jpgs(pages: impl IntoIterator<Item = usize>) -> Vec<String> {
    pages.into_iter().map(|p| format!("{:04}.jpg", p)).collect()
}

fn checkpoint_at(folder: &Path, page: usize, sub_stage: SubStage) -> ResumeCheckpoint {
    ResumeCheckpoint {
        url: URL.to_string(),
        page,
        absolute_page: Some(page),
        folder: folder.to_path_buf(),
        stage: JobStage::Paused,
        sub_stage,
        stage_data: StageData::default(),
        download_range: None,
        reason: CheckpointReason::UserPause,
        timestamp: 0,
    }
}

#[test]
fn range_window_downloads_only_selected_pages() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    let env = env(gallery.clone());
    let id = env.state.push(URL);

    let out = run(&env, &job_options(dl.path(), RangeConfig::pages(3, Some(7))), id);

    assert_eq!(out.status, UrlStatus::Completed);
    assert_eq!(out.directive, Directive::Continue);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs(3..=6));
    assert_eq!(gallery.image_fetches(), 4);
    assert!(env.state.checkpoint(URL).unwrap().is_none());
    assert_eq!(env.tracker.get(id).unwrap().phase, ProgressPhase::Completed);
}

#[test]
fn exhausted_page_leaves_placeholder_and_ends_incomplete() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    gallery.fail_image(URL, 5, usize::MAX, FetchError::network("img5", "connection reset"));
    let env = env(gallery.clone());
    let id = env.state.push(URL);

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Incomplete);
    assert_eq!(env.state.status(id), Some(UrlStatus::Incomplete));
    let mut expected = jpgs((1..=4).chain(6..=10));
    expected.push("0005.skipped".to_string());
    expected.sort();
    assert_eq!(files_in(&gallery_dir(dl.path())), expected);
    // 9 good pages plus three attempts at page 5.
    assert_eq!(gallery.image_fetches(), 12);

    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint kept");
    assert_eq!(cp.stage_data.skipped_pages, vec![5]);
    assert_eq!(cp.reason, CheckpointReason::ImageFailed);
    assert_eq!(cp.stage, JobStage::Incomplete);
}

#[test]
fn rerun_backfills_earlier_gap_only() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    gallery.fail_image(URL, 5, usize::MAX, FetchError::network("img5", "connection reset"));
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    let opts = job_options(dl.path(), RangeConfig::disabled());
    assert_eq!(run(&env, &opts, id).status, UrlStatus::Incomplete);

    gallery.fail_image(URL, 5, 0, FetchError::network("img5", "healed"));
    let before = gallery.image_fetches();
    let out = run(&env, &opts, id);

    assert_eq!(out.status, UrlStatus::Completed);
    assert_eq!(gallery.image_fetches() - before, 1);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs(1..=10));
    assert!(env.state.checkpoint(URL).unwrap().is_none());
}

#[test]
fn stop_after_saved_page_resumes_at_next_page() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    let env = env(gallery.clone());
    let arbiter = Arc::clone(&env.arbiter);
    gallery.on_image(move |url| {
        if url.ends_with("/img/4.jpg") {
            arbiter.request_stop();
        }
    });
    let id = env.state.push(URL);
    let opts = job_options(dl.path(), RangeConfig::disabled());

    let out = run(&env, &opts, id);
    assert_eq!(out.status, UrlStatus::Paused);
    assert_eq!(out.directive, Directive::StopRun);
    let folder = gallery_dir(dl.path());
    assert_eq!(files_in(&folder), jpgs(1..=4));
    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint");
    assert_eq!((cp.page, cp.sub_stage), (4, SubStage::After));
    assert_eq!(cp.reason, CheckpointReason::UserStop);
    assert_eq!(cp.resume_page(), 5);

    env.arbiter.clear_stop();
    let out = run(&env, &opts, id);
    assert_eq!(out.status, UrlStatus::Completed);
    assert_eq!(files_in(&folder), jpgs(1..=10));
    assert_eq!(gallery.image_fetches(), 10);
}

#[test]
fn checkpoint_before_write_retries_that_page() {
    let dl = tempdir().unwrap();
    let folder = dl.path().join("existing");
    std::fs::create_dir_all(&folder).unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    env.state
        .save_checkpoint(&checkpoint_at(&folder, 3, SubStage::Before))
        .unwrap();

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Completed);
    assert_eq!(gallery.image_fetches(), 8);
    assert_eq!(files_in(&folder), jpgs(3..=10));
}

#[test]
fn range_beyond_gallery_is_incomplete_and_pauses_queue() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 5);
    let env = env(gallery.clone());
    let id = env.state.push(URL);

    let out = run(&env, &job_options(dl.path(), RangeConfig::pages(8, Some(12))), id);

    assert_eq!(out.status, UrlStatus::Incomplete);
    assert_eq!(out.directive, Directive::PauseQueue { auto_resume: false });
    assert!(out.reason.unwrap().contains("range"));
    assert_eq!(gallery.image_fetches(), 0);
    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint");
    assert_eq!(cp.reason, CheckpointReason::ConfigError);
}

#[test]
fn skip_takes_priority_over_stop() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 3);
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    env.arbiter.set_active(Some(id));
    env.arbiter.request_stop();
    assert!(env.arbiter.request_skip(id));

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Skipped);
    assert_eq!(out.directive, Directive::Continue);
    assert_eq!(gallery.image_fetches(), 0);
    assert!(env.arbiter.stop_requested(), "stop stays pending for the scheduler");
}

#[test]
fn fresh_restart_drops_checkpoint_and_reruns() {
    let dl = tempdir().unwrap();
    let folder = dl.path().join("existing");
    std::fs::create_dir_all(&folder).unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 3);
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    env.state
        .save_checkpoint(&checkpoint_at(&folder, 2, SubStage::After))
        .unwrap();
    env.arbiter.set_active(Some(id));
    assert!(env.arbiter.request_restart(id, RestartMode::Fresh));

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Pending);
    assert_eq!(out.directive, Directive::RerunJob);
    assert!(env.state.checkpoint(URL).unwrap().is_none());
    assert!(env.arbiter.check(id).is_none(), "restart flag consumed");
}

#[test]
fn missing_folder_on_resume_skips_gallery_and_keeps_checkpoint() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 3);
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    env.state
        .save_checkpoint(&checkpoint_at(&dl.path().join("gone"), 2, SubStage::After))
        .unwrap();

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Skipped);
    assert_eq!(out.directive, Directive::Continue);
    assert!(env.state.checkpoint(URL).unwrap().is_some());
}

#[test]
fn open_breaker_pauses_with_auto_resume() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 3);
    gallery.fail_gallery(URL, FetchError::network(URL, "timed out"));
    let env = env(gallery.clone()).with_breaker(CircuitBreaker::new(2, Duration::from_secs(60)));
    let id = env.state.push(URL);

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Paused);
    assert_eq!(out.directive, Directive::PauseQueue { auto_resume: true });
    assert!(env.breaker.is_open());
    // No folder yet, so nothing to checkpoint.
    assert!(env.state.checkpoint(URL).unwrap().is_none());
}

#[test]
fn parse_error_on_page_pauses_and_resumes_at_that_page() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 4);
    gallery.fail_image(URL, 2, 1, FetchError::parse("img2", "truncated html"));
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    let opts = job_options(dl.path(), RangeConfig::disabled());

    let out = run(&env, &opts, id);
    assert_eq!(out.status, UrlStatus::Paused);
    assert_eq!(out.directive, Directive::PauseQueue { auto_resume: false });
    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint");
    assert_eq!((cp.page, cp.sub_stage), (2, SubStage::Before));
    assert_eq!(cp.reason, CheckpointReason::JobError);

    let out = run(&env, &opts, id);
    assert_eq!(out.status, UrlStatus::Completed);
    assert_eq!(gallery.image_fetches(), 2 + 3);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs(1..=4));
}

#[test]
fn too_many_skipped_images_skip_the_gallery() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 6);
    gallery.fail_image(URL, 2, usize::MAX, FetchError::Other("decoder exploded".into()));
    gallery.fail_image(URL, 3, usize::MAX, FetchError::Other("decoder exploded".into()));
    let env = env(gallery.clone());
    let id = env.state.push(URL);
    let mut opts = job_options(dl.path(), RangeConfig::disabled());
    opts.skip_url_after_skipped_images = Some(2);

    let out = run(&env, &opts, id);

    assert_eq!(out.status, UrlStatus::Skipped);
    assert_eq!(gallery.image_fetches(), 3);
    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint");
    assert_eq!(cp.stage_data.skipped_pages, vec![2, 3]);
}

#[test]
fn disk_full_drops_page_without_placeholder() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 3);
    gallery.fail_image(
        URL,
        2,
        1,
        FetchError::DiskFull {
            path: PathBuf::from("/dl/0002.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no space left"),
        },
    );
    let env = env(gallery.clone());
    let id = env.state.push(URL);

    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);

    assert_eq!(out.status, UrlStatus::Incomplete);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs([1, 3]));
    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint");
    assert_eq!(cp.stage_data.failed_pages, vec![2]);
    assert!(cp.stage_data.skipped_pages.is_empty());
}

#[test]
fn range_change_after_checkpoint_remaps_resume_page() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    let env = env(gallery.clone());
    let arbiter = Arc::clone(&env.arbiter);
    gallery.on_image(move |url| {
        if url.ends_with("/img/5.jpg") {
            arbiter.request_stop();
        }
    });
    let id = env.state.push(URL);

    // Window 3..=9: stop after absolute page 5 (relative 3).
    let out = run(&env, &job_options(dl.path(), RangeConfig::pages(3, Some(10))), id);
    assert_eq!(out.status, UrlStatus::Paused);
    let cp = env.state.checkpoint(URL).unwrap().expect("checkpoint");
    assert_eq!((cp.page, cp.absolute_page), (3, Some(5)));

    // New window 2..=9: absolute 6 is relative 5, and absolute 2 is backfilled.
    env.arbiter.clear_stop();
    let before = gallery.image_fetches();
    let out = run(&env, &job_options(dl.path(), RangeConfig::pages(2, Some(10))), id);
    assert_eq!(out.status, UrlStatus::Completed);
    assert_eq!(gallery.image_fetches() - before, 5);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs(2..=9));
}

#[test]
fn dropping_the_range_after_checkpoint_fetches_leading_pages() {
    let dl = tempdir().unwrap();
    let gallery = FakeGallery::new();
    gallery.add(URL, 10);
    let env = env(gallery.clone());
    let arbiter = Arc::clone(&env.arbiter);
    gallery.on_image(move |url| {
        if url.ends_with("/img/5.jpg") {
            arbiter.request_stop();
        }
    });
    let id = env.state.push(URL);

    let out = run(&env, &job_options(dl.path(), RangeConfig::pages(3, Some(10))), id);
    assert_eq!(out.status, UrlStatus::Paused);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs(3..=5));

    env.arbiter.clear_stop();
    let before = gallery.image_fetches();
    let out = run(&env, &job_options(dl.path(), RangeConfig::disabled()), id);
    assert_eq!(out.status, UrlStatus::Completed);
    // Pages 1, 2 and 6 to 10.
    assert_eq!(gallery.image_fetches() - before, 7);
    assert_eq!(files_in(&gallery_dir(dl.path())), jpgs(1..=10));
    assert!(env.state.checkpoint(URL).unwrap().is_none());
}
