//! Merged child output stream.
//!
//! The downloader's stdout and stderr are pumped line-by-line into one
//! channel so the supervisor sees a single stream in arrival order. Lines
//! are decoded as UTF-8 with invalid sequences replaced, never rejected:
//! the child's output is untrusted text.

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tracing::warn;

/// Spawn pump tasks for both pipes and return the merged line receiver.
///
/// The receiver yields `None` once both pipes have hit end-of-stream and
/// every buffered line has been consumed. Dropping the receiver stops the
/// pumps on their next send.
pub(crate) fn merge_output(stdout: ChildStdout, stderr: ChildStderr) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(pump(stdout, tx.clone(), "stdout"));
    tokio::spawn(pump(stderr, tx, "stderr"));
    rx
}

async fn pump<R>(reader: R, tx: mpsc::Sender<String>, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut pending = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Error reading downloader {name}: {e}");
                break;
            }
        };

        pending.extend_from_slice(&chunk[..n]);
        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=pos).collect();
            if tx.send(decode_line(&raw)).await.is_err() {
                return;
            }
        }
    }

    // Unterminated trailing output still counts as a line
    if !pending.is_empty() {
        let _ = tx.send(decode_line(&pending)).await;
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut line = String::from_utf8_lossy(raw).into_owned();
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}
