//! Control socket: server (during `gdm run`) and client (for `gdm skip`, `gdm pause`, ...).
//! Protocol: one command per line ("add <url>", "remove <id>", "skip <id>",
//! "restart <id> [fresh]", "pause", "resume", "stop"), answered with one line:
//! "ok", "ok <id>" (after add), "unknown" or "error <message>".

use anyhow::{bail, Result};
use gdm_core::control::RestartMode;
use gdm_core::scheduler::QueueHandle;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Add(String),
    Remove(i64),
    Skip(i64),
    Restart { id: i64, fresh: bool },
    Pause,
    Resume,
    Stop,
}

impl ControlCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = match parts.next()? {
            "add" => ControlCommand::Add(parts.next()?.to_string()),
            "remove" => ControlCommand::Remove(parts.next()?.parse().ok()?),
            "skip" => ControlCommand::Skip(parts.next()?.parse().ok()?),
            "restart" => {
                let id = parts.next()?.parse().ok()?;
                let fresh = match parts.next() {
                    None => false,
                    Some("fresh") => true,
                    Some(_) => return None,
                };
                ControlCommand::Restart { id, fresh }
            }
            "pause" => ControlCommand::Pause,
            "resume" => ControlCommand::Resume,
            "stop" => ControlCommand::Stop,
            _ => return None,
        };
        match parts.next() {
            Some(_) => None,
            None => Some(cmd),
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            ControlCommand::Add(url) => format!("add {}\n", url),
            ControlCommand::Remove(id) => format!("remove {}\n", id),
            ControlCommand::Skip(id) => format!("skip {}\n", id),
            ControlCommand::Restart { id, fresh: true } => format!("restart {} fresh\n", id),
            ControlCommand::Restart { id, fresh: false } => format!("restart {}\n", id),
            ControlCommand::Pause => "pause\n".to_string(),
            ControlCommand::Resume => "resume\n".to_string(),
            ControlCommand::Stop => "stop\n".to_string(),
        }
    }
}

/// Outcome of a command accepted by a running `gdm run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    Done,
    /// The URL was queued under this id.
    Added(i64),
    /// The command named an entry that does not exist.
    Unknown,
}

impl ControlReply {
    fn found(found: bool) -> Self {
        if found {
            ControlReply::Done
        } else {
            ControlReply::Unknown
        }
    }

    fn to_line(self) -> String {
        match self {
            ControlReply::Done => "ok\n".to_string(),
            ControlReply::Added(id) => format!("ok {}\n", id),
            ControlReply::Unknown => "unknown\n".to_string(),
        }
    }

    fn parse(line: &str) -> Option<Self> {
        match line {
            "ok" => Some(ControlReply::Done),
            "unknown" => Some(ControlReply::Unknown),
            other => other
                .strip_prefix("ok ")
                .and_then(|id| id.parse().ok())
                .map(ControlReply::Added),
        }
    }
}

/// Applies `cmd` to the queue. Blocks on the database; call from a blocking context.
fn apply(handle: &QueueHandle, cmd: ControlCommand) -> Result<ControlReply> {
    match cmd {
        ControlCommand::Add(url) => {
            if let Err(e) = url::Url::parse(&url) {
                bail!("not a valid URL: {} ({})", url, e);
            }
            Ok(ControlReply::Added(handle.push(url)))
        }
        ControlCommand::Remove(id) => handle.remove(id).map(ControlReply::found),
        ControlCommand::Skip(id) => handle.skip(id).map(ControlReply::found),
        ControlCommand::Restart { id, fresh } => {
            let mode = if fresh {
                RestartMode::Fresh
            } else {
                RestartMode::Resume
            };
            handle.restart(id, mode).map(ControlReply::found)
        }
        ControlCommand::Pause => {
            handle.pause();
            Ok(ControlReply::Done)
        }
        ControlCommand::Resume => {
            handle.resume();
            Ok(ControlReply::Done)
        }
        ControlCommand::Stop => {
            handle.stop();
            Ok(ControlReply::Done)
        }
    }
}

async fn reply_for(handle: &QueueHandle, line: &str) -> String {
    let Some(cmd) = ControlCommand::parse(line) else {
        return format!("error malformed command: {}\n", line);
    };
    tracing::info!(?cmd, "control request");
    let h = handle.clone();
    match tokio::task::spawn_blocking(move || apply(&h, cmd)).await {
        Ok(Ok(reply)) => reply.to_line(),
        Ok(Err(e)) => format!("error {:#}\n", e),
        Err(e) => format!("error {}\n", e),
    }
}

/// Spawns a task that listens on `path` and applies each command to `handle`.
pub fn spawn_control_listener(
    handle: QueueHandle,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let handle = handle.clone();
                    tokio::spawn(async move {
                        let (read, mut write) = stream.into_split();
                        let mut lines = BufReader::new(read).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            let reply = reply_for(&handle, line).await;
                            if write.write_all(reply.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(task)
}

/// Sends `cmd` to a running `gdm run`. Returns `None` when no run is listening.
pub async fn send(socket_path: &Path, cmd: ControlCommand) -> Result<Option<ControlReply>> {
    if !socket_path.exists() {
        return Ok(None);
    }
    let mut stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %socket_path.display(), "stale control socket: {}", e);
            return Ok(None);
        }
    };
    stream.write_all(cmd.to_line().as_bytes()).await?;
    let mut reply = String::new();
    BufReader::new(stream).read_line(&mut reply).await?;
    let reply = reply.trim();
    if let Some(parsed) = ControlReply::parse(reply) {
        return Ok(Some(parsed));
    }
    match reply.strip_prefix("error ") {
        Some(msg) => bail!("run rejected command: {}", msg),
        None => bail!("unexpected control reply: {:?}", reply),
    }
}

/// Sends `cmd` to the run on the default control socket, if any.
pub async fn send_default(cmd: ControlCommand) -> Result<Option<ControlReply>> {
    match gdm_core::control::default_control_socket_path() {
        Ok(path) => send(&path, cmd).await,
        Err(e) => {
            tracing::debug!("no control socket path: {}", e);
            Ok(None)
        }
    }
}
