// ==============================================================================
// Shell command execution
// ==============================================================================
//
// Everything the user configures is a shell one-liner, so commands run under
// `sh -c` (`cmd /c` on Windows). On POSIX each child gets its own process
// group; cancelling a lint run kills the whole group, which takes down any
// helpers the tool spawned. Format runs are never cancelled mid-request (the
// debounce layer drops the superseding request instead), so they use a plain
// wait.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[cfg(unix)]
const SHELL: &str = "sh";
#[cfg(unix)]
const SHELL_FLAG: &str = "-c";
#[cfg(windows)]
const SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_FLAG: &str = "/c";

/// Build the child process: shell wrapper, working directory (when the
/// effective root is non-empty), inherited environment plus the config's
/// `KEY=VALUE` bindings, piped capture, optional piped stdin.
fn shell_command(command: &str, root_path: &str, env: &[String], stdin: bool) -> Command {
    let mut std_cmd = std::process::Command::new(SHELL);
    std_cmd.arg(SHELL_FLAG).arg(command);
    if !root_path.is_empty() {
        std_cmd.current_dir(root_path);
    }
    for binding in env {
        if let Some((key, value)) = binding.split_once('=') {
            std_cmd.env(key, value);
        }
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }

    let mut cmd = Command::from(std_cmd);
    cmd.stdin(if stdin { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // Negative pid addresses the whole group.
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(windows)]
fn kill_process_group(_pid: Option<u32>) {
    // No process groups; kill_on_drop reaps the direct child.
}

/// Feed the buffer to the child's stdin from a separate task: a child that
/// fills its output pipe before draining stdin would otherwise deadlock
/// against our write. The pipe closes when the write finishes; a child that
/// exits without reading just gives the writer EPIPE, which is fine.
fn feed_stdin(child: &mut tokio::process::Child, input: Option<&str>) {
    let Some(input) = input else { return };
    let Some(mut stdin) = child.stdin.take() else {
        return;
    };
    let data = input.as_bytes().to_vec();
    tokio::spawn(async move {
        let _ = stdin.write_all(&data).await;
    });
}

fn subprocess_error(command: &str, message: impl ToString) -> Error {
    Error::Subprocess {
        command: command.to_string(),
        message: message.to_string(),
    }
}

/// Run a formatter: the buffer goes in on stdin, the formatted buffer comes
/// out on stdout. Non-zero exit fails with the child's stderr in the message.
pub async fn run_format_command(command: &str, root_path: &str, env: &[String], input: &str) -> Result<String> {
    let mut child = shell_command(command, root_path, env, true)
        .spawn()
        .map_err(|e| subprocess_error(command, e))?;

    feed_stdin(&mut child, Some(input));

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| subprocess_error(command, e))?;

    if !output.status.success() {
        return Err(subprocess_error(
            command,
            String::from_utf8_lossy(&output.stderr),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a linter under a cancellation token and classify its exit:
///
/// - exit 0 → output only when `ignore_exit_code` (a clean run has nothing
///   to parse otherwise)
/// - positive exit → output (the normal "lint found something" case)
/// - killed by a signal (no exit code) → cancelled; nothing to parse
///
/// stdout and stderr are concatenated because linters disagree about which stream
/// diagnostics belong on, and the scanner does not care.
pub async fn run_lint_command(
    command: &str,
    root_path: &str,
    env: &[String],
    input: Option<&str>,
    ignore_exit_code: bool,
    cancel: &CancellationToken,
) -> Result<Option<String>> {
    let mut child = shell_command(command, root_path, env, input.is_some())
        .spawn()
        .map_err(|e| subprocess_error(command, e))?;

    feed_stdin(&mut child, input);

    let pid = child.id();
    let output_fut = child.wait_with_output();
    tokio::pin!(output_fut);

    let output = tokio::select! {
        result = &mut output_fut => result.map_err(|e| subprocess_error(command, e))?,
        _ = cancel.cancelled() => {
            kill_process_group(pid);
            (&mut output_fut).await.map_err(|e| subprocess_error(command, e))?
        }
    };

    if output.status.success() && !ignore_exit_code {
        return Ok(None);
    }
    if !output.status.success() && output.status.code().is_none() {
        // Signal death: cancelled (or externally killed), swallow.
        return Ok(None);
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(Some(combined))
}
