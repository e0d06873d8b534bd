//! Child-process execution with a timeout and bounded capture.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Bytes of stdout/stderr kept per invocation.
const OUTPUT_LIMIT_BYTES: usize = 50_000;

/// Captured output of one collaborator invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a collaborator command, killing it after `timeout`.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<CommandOutput> {
    let program = cmd.get_program().to_string_lossy().to_string();
    debug!(program = %program, timeout_secs = timeout.as_secs(), "spawning collaborator");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {program}"))?;

    let mut timed_out = false;
    let status = match child
        .wait_timeout(timeout)
        .with_context(|| format!("wait for {program}"))?
    {
        Some(status) => status,
        None => {
            warn!(program = %program, timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().ok();
            child.wait().context("wait after kill")?
        }
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout).context("read stdout")?;
    }
    if let Some(mut err) = child.stderr.take() {
        err.read_to_end(&mut stderr).context("read stderr")?;
    }
    truncate_output(&mut stdout, OUTPUT_LIMIT_BYTES);
    truncate_output(&mut stderr, OUTPUT_LIMIT_BYTES);

    Ok(CommandOutput {
        exit_code: status.code(),
        success: !timed_out && status.success(),
        timed_out,
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
    })
}

/// Write an invocation's combined output for later inspection.
pub fn write_log(path: &Path, output: &CommandOutput) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let combined = format!("{}{}", output.stdout, output.stderr);
    fs::write(path, combined).with_context(|| format!("write log {}", path.display()))?;
    Ok(())
}

fn truncate_output(buf: &mut Vec<u8>, limit: usize) -> bool {
    if buf.len() > limit {
        buf.truncate(limit);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn captures_exit_status_and_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf out; printf err >&2; exit 3"]);
        let output = run_with_timeout(&mut cmd, Duration::from_secs(5)).expect("run");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success);
        assert!(!output.timed_out);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
    }

    #[test]
    fn kills_after_timeout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 30"]);
        let output = run_with_timeout(&mut cmd, Duration::from_millis(100)).expect("run");
        assert!(output.timed_out);
        assert!(!output.success);
    }

    #[test]
    fn writes_combined_log() {
        let temp = tempdir().expect("tempdir");
        let output = CommandOutput {
            exit_code: Some(0),
            success: true,
            timed_out: false,
            stdout: "hello ".to_string(),
            stderr: "world".to_string(),
        };
        let path = temp.path().join("logs/build.log");
        write_log(&path, &output).expect("write");
        assert_eq!(fs::read_to_string(path).expect("read"), "hello world");
    }
}
