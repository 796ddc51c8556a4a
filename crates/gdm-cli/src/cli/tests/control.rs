use crate::cli::control_socket::{self, ControlCommand, ControlReply};
use gdm_core::job::JobEnv;
use gdm_core::scheduler::{QueueScheduler, SchedulerOptions};
use gdm_core::state::{StateStore, UrlStatus};
use gdm_core::storage::FsImageStore;
use gdm_core::transport::ManifestFetcher;
use std::sync::Arc;

#[test]
fn control_command_lines() {
    for cmd in [
        ControlCommand::Add("https://g.example/g/7".to_string()),
        ControlCommand::Remove(3),
        ControlCommand::Skip(4),
        ControlCommand::Restart { id: 2, fresh: true },
        ControlCommand::Restart { id: 2, fresh: false },
        ControlCommand::Pause,
        ControlCommand::Resume,
        ControlCommand::Stop,
    ] {
        assert_eq!(ControlCommand::parse(cmd.to_line().trim()), Some(cmd.clone()));
    }
    assert_eq!(ControlCommand::parse("skip"), None);
    assert_eq!(ControlCommand::parse("add"), None);
    assert_eq!(ControlCommand::parse("add a b"), None);
    assert_eq!(ControlCommand::parse("remove x"), None);
    assert_eq!(ControlCommand::parse("skip x"), None);
    assert_eq!(ControlCommand::parse("restart 1 later"), None);
    assert_eq!(ControlCommand::parse("pause now"), None);
    assert_eq!(ControlCommand::parse("cancel 1"), None);
}

fn queue_env() -> JobEnv {
    JobEnv::new(
        Arc::new(ManifestFetcher::new()),
        Arc::new(FsImageStore::new()),
        Arc::new(StateStore::default()),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn socket_applies_commands_to_queue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control.sock");
    let env = queue_env();
    let state = Arc::clone(&env.state);
    let id = state.push("https://g.example/1");
    let scheduler = QueueScheduler::new(env, SchedulerOptions::default());
    let task = control_socket::spawn_control_listener(scheduler.handle(), &path).unwrap();

    let applied = control_socket::send(&path, ControlCommand::Skip(id)).await.unwrap();
    assert_eq!(applied, Some(ControlReply::Done));
    assert_eq!(state.status(id), Some(UrlStatus::Skipped));

    let unknown = control_socket::send(&path, ControlCommand::Skip(999)).await.unwrap();
    assert_eq!(unknown, Some(ControlReply::Unknown));

    task.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn socket_add_and_remove_edit_the_live_queue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control.sock");
    let env = queue_env();
    let state = Arc::clone(&env.state);
    let first = state.push("https://g.example/1");
    let scheduler = QueueScheduler::new(env, SchedulerOptions::default());
    let task = control_socket::spawn_control_listener(scheduler.handle(), &path).unwrap();

    let cmd = ControlCommand::Add("https://g.example/2".to_string());
    let reply = control_socket::send(&path, cmd).await.unwrap();
    let Some(ControlReply::Added(added)) = reply else {
        panic!("unexpected reply {:?}", reply);
    };
    let entry = state.entry(added).expect("queued entry");
    assert_eq!(entry.url, "https://g.example/2");
    assert_eq!(entry.status, UrlStatus::Pending);

    let reply = control_socket::send(&path, ControlCommand::Remove(first)).await.unwrap();
    assert_eq!(reply, Some(ControlReply::Done));
    let ids: Vec<_> = state.entries().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![added]);

    let reply = control_socket::send(&path, ControlCommand::Remove(first)).await.unwrap();
    assert_eq!(reply, Some(ControlReply::Unknown));

    let bad = ControlCommand::Add("not-a-url".to_string());
    assert!(control_socket::send(&path, bad).await.is_err());

    task.abort();
}

#[tokio::test]
async fn send_without_listener_reports_no_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sock");
    let res = control_socket::send(&path, ControlCommand::Pause).await.unwrap();
    assert_eq!(res, None);
}
