use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{EventBus, HostMessage, PanelEvent};
use crate::actions::Action;
use crate::error::HostError;

/// Outbound side of the connection to the host
pub enum HostLink {
    /// Host child process speaking JSON lines on stdin/stdout
    Process { child: Child, stdin: ChildStdin },
    /// No host configured; outbound events are only logged
    Detached,
}

impl HostLink {
    /// Spawn the host and start routing its stdout into `tx` and `bus`
    pub fn spawn(
        command: &str,
        args: &[String],
        tx: mpsc::UnboundedSender<Action>,
        bus: EventBus,
    ) -> Result<(Self, JoinHandle<()>)> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(HostError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(HostError::MissingPipe("stdout"))
            .context("Failed to attach to host output")?;

        tracing::info!(command, ?args, pid = child.id(), "Host process started");
        let reader = spawn_reader(stdout, tx, bus);
        Ok((Self::Process { child, stdin }, reader))
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached)
    }

    /// Write one panel event to the host.
    ///
    /// Returns whether the event reached a host; a detached link only logs it.
    pub async fn send(&mut self, event: &PanelEvent) -> Result<bool, HostError> {
        match self {
            Self::Process { stdin, .. } => {
                let mut line = serde_json::to_vec(event)?;
                line.push(b'\n');
                stdin.write_all(&line).await?;
                stdin.flush().await?;
                tracing::debug!(kind = event.kind(), "Sent panel event");
                Ok(true)
            }
            Self::Detached => {
                tracing::info!(kind = event.kind(), ?event, "No host attached, dropping panel event");
                Ok(false)
            }
        }
    }

    /// Stop the host process, if any
    pub async fn shutdown(self) {
        if let Self::Process { mut child, stdin } = self {
            drop(stdin);
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to stop host process");
            }
        }
    }
}

/// Route host output lines: events go to the bus, everything else becomes
/// an [`Action`]. Malformed lines are logged and skipped.
fn spawn_reader<R>(
    reader: R,
    tx: mpsc::UnboundedSender<Action>,
    bus: EventBus,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match HostMessage::parse(line) {
                        Ok(message) => route(message, &tx, &bus),
                        Err(e) => tracing::warn!(error = %e, "Skipping malformed host line"),
                    }
                }
                Ok(None) => {
                    tracing::info!("Host output closed");
                    let _ = tx.send(Action::Error("Host disconnected".to_string()));
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read host output");
                    let _ = tx.send(Action::Error(format!("Host: {}", e)));
                    break;
                }
            }
        }
    })
}

fn route(message: HostMessage, tx: &mpsc::UnboundedSender<Action>, bus: &EventBus) {
    let action = match message {
        HostMessage::Event { event } => {
            let delivered = bus.publish(&event);
            tracing::trace!(event_type = %event.event_type, delivered, "Event published");
            return;
        }
        HostMessage::Slice(slice) => Action::SliceUpdated(slice),
        HostMessage::Repository { path } => Action::RepositoryChanged(path),
        HostMessage::InvokeTool { id, name, input } => Action::ToolInvoked { id, name, input },
    };
    let _ = tx.send(action);
}
