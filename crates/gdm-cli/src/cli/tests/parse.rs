use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_add_many() {
    match parse(&["gdm", "add", "https://g.example/1", "file:///tmp/m.json"]) {
        CliCommand::Add { urls } => {
            assert_eq!(urls, vec!["https://g.example/1", "file:///tmp/m.json"])
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_requires_url() {
    assert!(Cli::try_parse_from(["gdm", "add"]).is_err());
}

#[test]
fn cli_parse_run_defaults() {
    match parse(&["gdm", "run"]) {
        CliCommand::Run {
            exit_on_pause,
            download_dir,
        } => {
            assert!(!exit_on_pause);
            assert!(download_dir.is_none());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_flags() {
    match parse(&["gdm", "run", "--exit-on-pause", "--download-dir", "/srv/galleries"]) {
        CliCommand::Run {
            exit_on_pause,
            download_dir,
        } => {
            assert!(exit_on_pause);
            assert_eq!(download_dir, Some(PathBuf::from("/srv/galleries")));
        }
        _ => panic!("expected Run with flags"),
    }
}

#[test]
fn cli_parse_skip_and_remove() {
    match parse(&["gdm", "skip", "7"]) {
        CliCommand::Skip { id } => assert_eq!(id, 7),
        _ => panic!("expected Skip"),
    }
    match parse(&["gdm", "remove", "99"]) {
        CliCommand::Remove { id } => assert_eq!(id, 99),
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_restart() {
    match parse(&["gdm", "restart", "3"]) {
        CliCommand::Restart { id, fresh } => {
            assert_eq!(id, 3);
            assert!(!fresh);
        }
        _ => panic!("expected Restart"),
    }
    match parse(&["gdm", "restart", "3", "--fresh"]) {
        CliCommand::Restart { fresh, .. } => assert!(fresh),
        _ => panic!("expected Restart --fresh"),
    }
}

#[test]
fn cli_parse_queue_controls() {
    assert!(matches!(parse(&["gdm", "pause"]), CliCommand::Pause));
    assert!(matches!(parse(&["gdm", "resume"]), CliCommand::Resume));
    assert!(matches!(parse(&["gdm", "stop"]), CliCommand::Stop));
    assert!(matches!(parse(&["gdm", "status"]), CliCommand::Status));
}

#[test]
fn cli_parse_completions_and_man() {
    match parse(&["gdm", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
    assert!(matches!(parse(&["gdm", "man"]), CliCommand::Man));
}

#[test]
fn cli_rejects_non_numeric_id() {
    assert!(Cli::try_parse_from(["gdm", "skip", "abc"]).is_err());
}
