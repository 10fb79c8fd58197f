//! Asynchronous external-process runner with streamed output.
//!
//! Converts one spawned child process into a single awaited outcome while
//! forwarding stdout chunks, as they arrive, over a progress channel.
//! Stderr is accumulated in arrival order and becomes the error message on
//! a nonzero exit.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::ProcessError;

/// An interim chunk of process standard output, delivered in arrival order.
///
/// Chunks are opaque text; ordering matters, content does not get parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Raw decoded text of the chunk.
    pub text: String,
}

/// Sending half of the progress channel threaded through every operation.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

const READ_BUF_SIZE: usize = 8192;

/// Run `program` with `args`, forwarding stdout chunks to `progress`.
///
/// The working directory defaults to the caller's current directory when
/// `cwd` is `None`. The future resolves once the process has exited and
/// both output streams are fully drained, so every progress chunk is
/// delivered before the final outcome. A nonzero exit becomes
/// [`ProcessError::Failed`] whose message is the concatenated stderr text,
/// or `"Process failed: <code>"` if the process wrote nothing to stderr.
pub async fn run(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    progress: &ProgressSender,
) -> Result<(), ProcessError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(cmd = %format!("{} {}", program, args.join(" ")), "spawning process");
    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProcessError::BinaryNotFound(program.to_string())
        } else {
            ProcessError::Io(e)
        }
    })?;

    let stdout = child.stdout.take();
    let progress_tx = progress.clone();
    let stdout_task = tokio::spawn(async move {
        if let Some(mut stdout) = stdout {
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                        // send fails only when the receiver is gone
                        let _ = progress_tx.send(ProgressEvent { text });
                    }
                }
            }
        }
    });

    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut captured = String::new();
        if let Some(mut stderr) = stderr {
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match stderr.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => captured.push_str(&String::from_utf8_lossy(&buf[..n])),
                }
            }
        }
        captured
    });

    let status = child.wait().await?;

    // Both streams must be drained before the outcome is reported.
    let _ = stdout_task.await;
    let captured = stderr_task.await.unwrap_or_default();

    if status.success() {
        debug!("process exited cleanly");
        return Ok(());
    }

    let code = status.code().unwrap_or(-1);
    let message = if captured.is_empty() {
        format!("Process failed: {}", code)
    } else {
        captured
    };
    warn!(code, "process failed");
    Err(ProcessError::Failed { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (ProgressSender, mpsc::UnboundedReceiver<ProgressEvent>) {
        mpsc::unbounded_channel()
    }

    /// Concatenate everything received so far; order-preserving.
    fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> String {
        let mut all = String::new();
        while let Ok(event) = rx.try_recv() {
            all.push_str(&event.text);
        }
        all
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_streams_stdout() {
        let (tx, mut rx) = channel();
        run("sh", &["-c", "printf hello"], None, &tx).await.unwrap();
        assert_eq!(drain(&mut rx), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_chunks_preserve_order() {
        let (tx, mut rx) = channel();
        run("sh", &["-c", "printf one; sleep 0.2; printf ' two'"], None, &tx)
            .await
            .unwrap();
        assert_eq!(drain(&mut rx), "one two");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_without_stderr_synthesizes_message() {
        let (tx, _rx) = channel();
        let err = run("sh", &["-c", "exit 3"], None, &tx).await.unwrap_err();
        match err {
            ProcessError::Failed { code, message } => {
                assert_eq!(code, 3);
                assert_eq!(message, "Process failed: 3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_chunks_concatenate_in_order() {
        let (tx, _rx) = channel();
        let err = run(
            "sh",
            &["-c", "printf abc 1>&2; sleep 0.1; printf def 1>&2; exit 1"],
            None,
            &tx,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "abcdef");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_is_not_forwarded_as_progress() {
        let (tx, mut rx) = channel();
        let _ = run("sh", &["-c", "printf noise 1>&2; exit 1"], None, &tx).await;
        assert_eq!(drain(&mut rx), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let (tx, mut rx) = channel();
        run("ls", &[], Some(dir.path()), &tx).await.unwrap();
        assert!(drain(&mut rx).contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_missing_binary_maps_to_not_found() {
        let (tx, _rx) = channel();
        let err = run("reposync-no-such-binary", &[], None, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::BinaryNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_receiver_does_not_fail_the_run() {
        let (tx, rx) = channel();
        drop(rx);
        run("sh", &["-c", "printf ignored"], None, &tx)
            .await
            .unwrap();
    }
}
