//! Process spawning, output streaming/capture, and cancellation escalation.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use super::cancel::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SIGINT_GRACE: Duration = Duration::from_secs(2);
const SIGTERM_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub exit_code: i32,
    pub canceled: bool,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

/// Build the shell invocation argv for `shell`: `-c <command>` for POSIX
/// shells, `-Command <command>` for pwsh.
pub fn shell_invocation(shell: &str, command: &str) -> (String, Vec<String>) {
    match shell {
        "pwsh" => ("pwsh".to_string(), vec!["-Command".to_string(), command.to_string()]),
        "zsh" => ("zsh".to_string(), vec!["-c".to_string(), command.to_string()]),
        "sh" => ("sh".to_string(), vec!["-c".to_string(), command.to_string()]),
        _ => ("bash".to_string(), vec!["-c".to_string(), command.to_string()]),
    }
}

/// Spawn `shell -c command` in `cwd` with `env` overlaid onto the inherited
/// environment, wait for exit honoring `cancel`, and classify the result.
///
/// `stream_output=true` passes stdout/stderr through to this process's own
/// streams; otherwise output is captured into a buffer capped at
/// `max_output_lines` lines per stream.
pub fn run_step(
    shell: &str,
    command: &str,
    cwd: &Path,
    env: &BTreeMap<String, String>,
    cancel: &CancellationToken,
    stream_output: bool,
    max_output_lines: usize,
) -> std::io::Result<ExecResult> {
    let (program, args) = shell_invocation(shell, command);

    let mut cmd = Command::new(&program);
    cmd.args(&args).current_dir(cwd);
    for (k, v) in env {
        cmd.env(k, v);
    }

    let (stdout_buf, stderr_buf, mut child) = if stream_output {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let make_empty = || -> LineBuffer { Arc::new(Mutex::new(Vec::new())) };
        (make_empty(), make_empty(), cmd.spawn()?)
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd.spawn()?;
        let stdout = capture_stream(child.stdout.take(), max_output_lines);
        let stderr = capture_stream(child.stderr.take(), max_output_lines);
        (stdout, stderr, child)
    };

    let exit_status = wait_with_cancellation(&mut child, cancel)?;

    let stdout = drain(stdout_buf);
    let stderr = drain(stderr_buf);

    match exit_status {
        None => Ok(ExecResult {
            exit_code: crate::exit_code::CANCELED,
            canceled: true,
            stdout,
            stderr,
        }),
        Some(status) => Ok(ExecResult {
            exit_code: status.code().unwrap_or(-1),
            canceled: false,
            stdout,
            stderr,
        }),
    }
}

type LineBuffer = Arc<Mutex<Vec<String>>>;

fn capture_stream<R: std::io::Read + Send + 'static>(
    stream: Option<R>,
    max_lines: usize,
) -> LineBuffer {
    let buffer: LineBuffer = Arc::new(Mutex::new(Vec::new()));
    let Some(stream) = stream else {
        return buffer;
    };
    let buffer_clone = Arc::clone(&buffer);
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            let mut buf = buffer_clone.lock().unwrap();
            if buf.len() < max_lines {
                buf.push(line);
            }
        }
    });
    buffer
}

fn drain(buffer: LineBuffer) -> Vec<String> {
    Arc::try_unwrap(buffer)
        .map(|m| m.into_inner().unwrap())
        .unwrap_or_else(|arc| arc.lock().unwrap().clone())
}

/// Returns `None` if the process was canceled (and killed), `Some(status)` otherwise.
fn wait_with_cancellation(
    child: &mut Child,
    cancel: &CancellationToken,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
            return Ok(Some(status));
        }
        if cancel.is_canceled() {
            escalate_shutdown(child)?;
            return Ok(None);
        }
    }
}

#[cfg(unix)]
fn send_signal(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(child.id() as i32), signal);
}

#[cfg(unix)]
fn escalate_shutdown(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::Signal;

    send_signal(child, Signal::SIGINT);
    if child.wait_timeout(SIGINT_GRACE)?.is_some() {
        return Ok(());
    }

    send_signal(child, Signal::SIGTERM);
    if child.wait_timeout(SIGTERM_GRACE)?.is_some() {
        return Ok(());
    }

    child.kill()?;
    child.wait()?;
    Ok(())
}

#[cfg(not(unix))]
fn escalate_shutdown(child: &mut Child) -> std::io::Result<()> {
    child.kill()?;
    child.wait()?;
    Ok(())
}
