//! Bundle execution over a process boundary.
//!
//! Located bundles run under a configured runtime (default `node`), invoked
//! with the selected files in load order. The executed bundle may write an
//! explicit verdict JSON to the path named by the `HOTCASE_VERDICT` env var;
//! when it does, that verdict is authoritative. Otherwise the verdict is
//! derived from the exit status, with stderr lines surfaced verbatim as
//! assertion failures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use harness::locate::BundleSelection;
use harness::scenario::{RunVerdict, RunnerBridge};

use crate::process::{CommandOutput, run_with_timeout, write_log};

/// Env var naming the path an executed bundle may write its verdict to.
pub const VERDICT_ENV: &str = "HOTCASE_VERDICT";

/// [`RunnerBridge`] implementation that executes bundles with an external
/// runtime.
pub struct ProcessBridge {
    command: Vec<String>,
    exchange_dir: PathBuf,
    logs_dir: PathBuf,
    timeout: Duration,
    runs: usize,
}

impl ProcessBridge {
    pub fn new(
        command: Vec<String>,
        exchange_dir: PathBuf,
        logs_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            command,
            exchange_dir,
            logs_dir,
            timeout,
            runs: 0,
        }
    }
}

impl RunnerBridge for ProcessBridge {
    #[instrument(skip_all, fields(run = self.runs + 1))]
    fn execute(&mut self, selection: &BundleSelection, dist: &Path) -> Result<RunVerdict> {
        self.runs += 1;
        fs::create_dir_all(&self.exchange_dir)
            .with_context(|| format!("create {}", self.exchange_dir.display()))?;
        let verdict_path = self.exchange_dir.join(format!("verdict-{}.json", self.runs));

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        for file in selection.files() {
            cmd.arg(dist.join(file));
        }
        cmd.current_dir(dist).env(VERDICT_ENV, &verdict_path);

        let output = run_with_timeout(&mut cmd, self.timeout).context("run bundles")?;
        write_log(
            &self.logs_dir.join(format!("runner.{}.log", self.runs)),
            &output,
        )?;

        if output.timed_out {
            return Ok(RunVerdict {
                passed: false,
                halted: false,
                failures: vec![format!("runner timed out after {}s", self.timeout.as_secs())],
            });
        }

        if verdict_path.exists() {
            debug!(verdict = %verdict_path.display(), "reading explicit verdict");
            return read_verdict(&verdict_path);
        }
        Ok(derive_verdict(&output))
    }
}

fn read_verdict(path: &Path) -> Result<RunVerdict> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read verdict {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse verdict {}", path.display()))
}

/// Fall back to exit-status semantics when the bundle wrote no verdict.
fn derive_verdict(output: &CommandOutput) -> RunVerdict {
    if output.success {
        return RunVerdict::pass();
    }
    let mut failures: Vec<String> = output
        .stderr
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();
    if failures.is_empty() {
        failures.push(format!("runner exited with {:?}", output.exit_code));
    }
    warn!(exit_code = ?output.exit_code, "bundle execution failed");
    RunVerdict {
        passed: false,
        halted: false,
        failures,
    }
}
