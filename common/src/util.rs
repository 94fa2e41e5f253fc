use std::{env, process::Stdio};

use eyre::{ContextCompat, Result, WrapErr, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// The user's shell from `$SHELL`, falling back to [`DEFAULT_SHELL`]
pub fn shell() -> String {
    shell_from(env::var("SHELL").ok())
}

fn shell_from(var: Option<String>) -> String {
    match var {
        Some(shell) if !shell.is_empty() => shell,
        _ => DEFAULT_SHELL.to_owned(),
    }
}

/// Runs `cmd` to completion and returns its stdout
///
/// The child is killed if `cancel` fires first. A non-zero exit is an error carrying
/// the child's stderr.
pub async fn command_with_output(cmd: &mut Command, cancel: &CancellationToken) -> Result<Vec<u8>> {
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .wrap_err("Spawning process")?;

    let output = tokio::select! {
        biased;
        () = cancel.cancelled() => bail!("Cancelled"),
        output = child.wait_with_output() => output.wrap_err("Waiting for process")?,
    };

    if !output.status.success() {
        bail!(
            "Process exited with {}, err: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}

/// Runs `cmd` to completion, forwarding every stdout and stderr line to the debug log
pub async fn command_with_logged_output(cmd: &mut Command, cancel: &CancellationToken) -> Result<()> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .wrap_err("Spawning process")?;
    let stdout = child.stdout.take().context("Missing process stdout")?;
    let stderr = child.stderr.take().context("Missing process stderr")?;

    let drain = async {
        let (out, err) = tokio::join!(log_lines(stdout, "stdout"), log_lines(stderr, "stderr"));
        out?;
        err?;
        child.wait().await.wrap_err("Waiting for process")
    };

    let status = tokio::select! {
        biased;
        () = cancel.cancelled() => bail!("Cancelled"),
        status = drain => status?,
    };

    if !status.success() {
        bail!("Process exited with {status}");
    }
    Ok(())
}

async fn log_lines(reader: impl AsyncRead + Unpin, stream: &str) -> Result<()> {
    let mut lines = BufReader::new(reader).split(b'\n');
    while let Some(line) = lines.next_segment().await? {
        debug!("{stream}: {}", String::from_utf8_lossy(&line).trim_end());
    }
    Ok(())
}
