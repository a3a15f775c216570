//! Streaming process runner
//!
//! Spawns an external command and forwards its stdout and stderr line by
//! line into the run log while the process is still running. One reader task
//! per stream feeds a bounded channel; the caller drains that channel into the
//! [`RunLog`] until both streams close, then waits for the exit status.

use crate::log::RunLog;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Runs `command` to completion, streaming its output into `log`.
///
/// `stdin_data` is written to the child's stdin and the pipe is closed; it is
/// never echoed to the log.
pub async fn run_streaming(
    mut command: Command,
    stdin_data: Option<&str>,
    log: &mut RunLog,
    capacity: usize,
) -> std::io::Result<ExitStatus> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
    }
    drop(tx);

    if let Some(data) = stdin_data
        && let Some(mut stdin) = child.stdin.take()
    {
        // 子プロセスが stdin を読まずに終了した場合の BrokenPipe は無視する
        match stdin.write_all(data.as_bytes()).await {
            Ok(()) => {
                let _ = stdin.shutdown().await;
            }
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("child closed stdin early");
            }
            Err(e) => return Err(e),
        }
    }

    while let Some(line) = rx.recv().await {
        log.push(line).await;
    }

    for reader in readers {
        match reader.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("output reader stopped: {}", e),
            Err(e) => tracing::debug!("output reader task failed: {}", e),
        }
    }

    child.wait().await
}

/// Reads `reader` until EOF, sending each line (or `\r`-separated progress
/// update) through `tx`. Invalid UTF-8 is replaced rather than dropped.
async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let text = String::from_utf8_lossy(&buf);
        for segment in text.trim_end_matches(['\n', '\r']).split('\r') {
            if segment.trim().is_empty() {
                continue;
            }
            if tx.send(segment.to_string()).await.is_err() {
                return Ok(());
            }
        }
    }
}

/// Renders a command for tracing. Arguments only; environment and stdin are
/// never included.
pub(crate) fn describe(program: &str, args: &[&str]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}
