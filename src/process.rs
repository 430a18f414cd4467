//! Renderer subprocess execution.
//!
//! ## Why drain concurrently?
//!
//! The renderer may start writing PDF bytes (or warnings) before it has read
//! all of its input. Writing stdin to completion first and only then reading
//! stdout can deadlock once either pipe buffer fills, so the stdin write and
//! both reads run under one `tokio::join!`. The exit status is collected only
//! after all three streams are closed.

use crate::command::RenderCommand;
use crate::error::WkPdfError;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Everything one renderer run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Raw stdout bytes (the PDF on success).
    pub stdout: Vec<u8>,
    /// Diagnostic text from stderr, lossily decoded.
    pub stderr: String,
    /// Process exit code; `128 + signal` when killed by a signal.
    pub exit_code: i32,
}

/// Fail fast when the host cannot run the renderer at all.
///
/// # Errors
/// [`WkPdfError::UnsupportedPlatform`] when processes cannot be spawned
/// (wasm targets) or the host does not use `/` as path separator.
pub fn check_requirements() -> Result<(), WkPdfError> {
    if cfg!(target_family = "wasm") {
        return Err(WkPdfError::UnsupportedPlatform(
            "program execution to be available".into(),
        ));
    }
    if std::path::MAIN_SEPARATOR != '/' {
        return Err(WkPdfError::UnsupportedPlatform("a Unix based system".into()));
    }
    Ok(())
}

/// Spawn `command`, feed it `input` on stdin, and collect its output.
///
/// With `timeout = None` this waits for as long as the renderer runs.
/// Otherwise the child is killed once `timeout` passes.
pub async fn execute(
    command: &RenderCommand,
    input: &[u8],
    timeout: Option<Duration>,
) -> Result<ExecutionResult, WkPdfError> {
    debug!("Spawning renderer: {}", command);

    let mut child = Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| WkPdfError::SpawnFailed {
            path: command.program().to_path_buf(),
            source: e,
        })?;

    let missing = |stream: &str| WkPdfError::Internal(format!("renderer {stream} pipe missing"));
    let mut stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
    let mut stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
    let mut stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

    let run = async {
        let write_stdin = async move {
            let written = stdin.write_all(input).await;
            // Dropping the handle closes the pipe so the renderer sees EOF.
            drop(stdin);
            written
        };
        let read_stdout = async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        };
        let read_stderr = async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        };

        let (written, out, err) = tokio::join!(write_stdin, read_stdout, read_stderr);
        let status = child.wait().await;
        (written, out, err, status)
    };

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, run).await.ok(),
        None => Some(run.await),
    };

    let Some((written, out, err, status)) = outcome else {
        let secs = timeout.map(|d| d.as_secs()).unwrap_or_default();
        warn!("Renderer exceeded {}s, killing it", secs);
        let _ = child.kill().await;
        return Err(WkPdfError::RendererTimeout { secs });
    };

    match written {
        Ok(()) => {}
        // The renderer may exit (or stop reading) before consuming its input.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("Renderer closed stdin early");
        }
        Err(e) => {
            return Err(WkPdfError::Internal(format!(
                "Failed to write to renderer stdin: {}",
                e
            )))
        }
    }

    let read_failed = |e: std::io::Error| {
        WkPdfError::Internal(format!("Failed to read renderer output: {}", e))
    };
    let stdout = out.map_err(read_failed)?;
    let stderr = err.map_err(read_failed)?;
    let status = status.map_err(|e| WkPdfError::Internal(format!("Failed to wait for renderer: {}", e)))?;

    let result = ExecutionResult {
        stdout,
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code: exit_code(status),
    };

    debug!(
        "Renderer exited with code {} ({} bytes stdout, {} bytes stderr)",
        result.exit_code,
        result.stdout.len(),
        result.stderr.len()
    );

    Ok(result)
}

/// Synchronous wrapper around [`execute`].
///
/// Creates a temporary tokio runtime internally.
pub fn execute_blocking(
    command: &RenderCommand,
    input: &[u8],
    timeout: Option<Duration>,
) -> Result<ExecutionResult, WkPdfError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| WkPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(execute(command, input, timeout))
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
