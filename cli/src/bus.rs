//! Feeding bus events to the ticker.
//!
//! The bus is either a long-running command whose stdout carries one event per line, or a file of
//! recorded events that is replayed once.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Context;
use tickertape_protocol::BusEvent;
use tickertape_tui::BusUpdate;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

const STDERR_LIMIT_BYTES: usize = 32 * 1024;

/// A bus command split into program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusCommand {
    program: String,
    args: Vec<String>,
}

impl BusCommand {
    /// Splits a shell-style command line.
    pub fn parse(command: &str) -> anyhow::Result<Self> {
        let mut words = shlex::split(command)
            .with_context(|| format!("invalid bus command: {command}"))?
            .into_iter();
        let Some(program) = words.next() else {
            anyhow::bail!("bus command is empty");
        };
        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum BusSource {
    Command(BusCommand),
    Replay(PathBuf),
}

/// Runs the bus in the background. The task always ends by sending [`BusUpdate::Closed`].
///
/// Aborting the task kills a running bus command.
pub fn spawn(source: BusSource, tx: UnboundedSender<BusUpdate>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = match source {
            BusSource::Command(command) => run_command(command, &tx).await,
            BusSource::Replay(path) => replay_file(path, &tx).await,
        };
        let detail = match result {
            Ok(detail) => detail,
            Err(err) => {
                warn!("notification bus failed: {err:#}");
                Some(format!("{err:#}"))
            }
        };
        let _ = tx.send(BusUpdate::Closed { detail });
    })
}

async fn replay_file(
    path: PathBuf,
    tx: &UnboundedSender<BusUpdate>,
) -> anyhow::Result<Option<String>> {
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    let forwarded = forward_lines(BufReader::new(file), tx)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    info!(path = %path.display(), forwarded, "replayed bus events");
    Ok(None)
}

async fn run_command(
    command: BusCommand,
    tx: &UnboundedSender<BusUpdate>,
) -> anyhow::Result<Option<String>> {
    let BusCommand { program, args } = command;
    let mut child = Command::new(&program)
        .args(&args)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start bus command `{program}`"))?;
    info!(%program, "bus command started");

    let stdout = child
        .stdout
        .take()
        .context("bus command stdout unavailable")?;
    let stderr = child
        .stderr
        .take()
        .context("bus command stderr unavailable")?;
    let capture = StderrCapture::default();
    let stderr_task = tokio::spawn(capture.clone().drain(stderr));

    let forwarded = forward_lines(BufReader::new(stdout), tx)
        .await
        .context("read bus command output")?;
    let status = child.wait().await.context("wait for bus command")?;
    let _ = stderr_task.await;

    info!(%program, %status, forwarded, "bus command exited");
    Ok(Some(exit_detail(&program, status, &capture)))
}

/// Parses bus lines and forwards them until EOF or until the receiver goes away.
///
/// Unparseable lines are logged and skipped. Returns the number of forwarded events.
pub async fn forward_lines<R>(
    reader: R,
    tx: &UnboundedSender<BusUpdate>,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0usize;
    let mut forwarded = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        match BusEvent::parse_line(&line) {
            Ok(Some(event)) => {
                debug!(line_number, id = %event.message_id(), "bus event received");
                if tx.send(BusUpdate::Event(event)).is_err() {
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(err) => warn!(line_number, "ignoring bus line: {err}"),
        }
    }
    Ok(forwarded)
}

/// The first [`STDERR_LIMIT_BYTES`] of a child's stderr; the rest is drained and dropped.
#[derive(Debug, Clone, Default)]
struct StderrCapture {
    bytes: Arc<Mutex<Vec<u8>>>,
    truncated: Arc<AtomicBool>,
}

impl StderrCapture {
    async fn drain<R: AsyncRead + Unpin>(self, mut stderr: R) -> std::io::Result<()> {
        let mut buf = [0u8; 4096];
        loop {
            let n = stderr.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            let mut bytes = match self.bytes.lock() {
                Ok(guard) => guard,
                Err(err) => err.into_inner(),
            };
            let take = STDERR_LIMIT_BYTES.saturating_sub(bytes.len()).min(n);
            bytes.extend_from_slice(&buf[..take]);
            if take < n {
                self.truncated.store(true, Ordering::Relaxed);
            }
        }
    }

    fn text(&self) -> String {
        let bytes = match self.bytes.lock() {
            Ok(guard) => guard,
            Err(err) => err.into_inner(),
        };
        String::from_utf8_lossy(&bytes).trim_end().to_string()
    }

    fn is_truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }
}

/// One-line summary for the footer; the full stderr goes to the log.
fn exit_detail(program: &str, status: ExitStatus, capture: &StderrCapture) -> String {
    let stderr = capture.text();
    if stderr.is_empty() {
        return format!("`{program}` exited with {status}");
    }
    warn!(
        %program,
        truncated = capture.is_truncated(),
        "bus command stderr:\n{stderr}"
    );
    let last_line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    format!("`{program}` exited with {status}: {last_line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::unbounded_channel;

    fn drain_events(rx: &mut tokio::sync::mpsc::UnboundedReceiver<BusUpdate>) -> Vec<BusUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    #[test]
    fn parses_shell_style_commands() {
        assert_eq!(
            BusCommand::parse("notify-bus --group 'chat room'").expect("parse"),
            BusCommand {
                program: "notify-bus".to_string(),
                args: vec!["--group".to_string(), "chat room".to_string()],
            }
        );
        assert!(BusCommand::parse("").is_err());
        assert!(BusCommand::parse("'unterminated").is_err());
    }

    #[tokio::test]
    async fn forward_lines_skips_blank_and_invalid_lines() {
        let input = concat!(
            "{\"type\":\"notify\",\"id\":\"m1\",\"group\":\"chat\",\"user\":\"ann\",\"text\":\"hi\"}\n",
            "\n",
            "{\"type\":\"bogus\"}\n",
            "plain words\n",
            "{\"type\":\"retract\",\"id\":\"m1\"}\n",
        );
        let (tx, mut rx) = unbounded_channel();

        let forwarded = forward_lines(input.as_bytes(), &tx).await.expect("forward");

        assert_eq!(forwarded, 3);
        let ids: Vec<String> = drain_events(&mut rx)
            .into_iter()
            .filter_map(|update| match update {
                BusUpdate::Event(event) => Some(event.to_string()),
                BusUpdate::Closed { .. } => None,
            })
            .collect();
        assert_eq!(ids, vec!["notify", "notify", "retract"]);
    }

    #[tokio::test]
    async fn replay_sends_events_then_closes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "first\nsecond\n").expect("write events");
        let (tx, mut rx) = unbounded_channel();

        spawn(BusSource::Replay(path), tx).await.expect("join");

        let updates = drain_events(&mut rx);
        assert_eq!(updates.len(), 3);
        assert!(matches!(
            updates.last(),
            Some(BusUpdate::Closed { detail: None })
        ));
    }

    #[tokio::test]
    async fn missing_replay_file_reports_closure_with_detail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, mut rx) = unbounded_channel();

        spawn(BusSource::Replay(dir.path().join("missing.jsonl")), tx)
            .await
            .expect("join");

        let updates = drain_events(&mut rx);
        assert!(matches!(
            updates.as_slice(),
            [BusUpdate::Closed { detail: Some(detail) }] if detail.contains("missing.jsonl")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_output_is_forwarded_and_stderr_summarized() {
        let command = BusCommand::parse(
            r#"sh -c 'echo "{\"type\":\"kill\",\"id\":\"m9\"}"; echo boom >&2; exit 3'"#,
        )
        .expect("parse");
        let (tx, mut rx) = unbounded_channel();

        spawn(BusSource::Command(command), tx).await.expect("join");

        let updates = drain_events(&mut rx);
        assert_eq!(updates.len(), 2);
        assert!(matches!(
            &updates[0],
            BusUpdate::Event(BusEvent::Kill { id }) if id.as_str() == "m9"
        ));
        let BusUpdate::Closed {
            detail: Some(detail),
        } = &updates[1]
        else {
            panic!("expected closure with detail, got {:?}", updates[1]);
        };
        assert!(detail.starts_with("`sh` exited with"));
        assert!(detail.ends_with(": boom"));
    }
}
