//! Case execution orchestration.
//!
//! Coordinates workspace creation, the scenario loop, the completion gate,
//! outcome classification, and result capture.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, instrument};

use harness::config::HarnessOptions;
use harness::gate::verify_full_consumption;
use harness::scenario::{ScenarioContext, run_scenario};

use crate::bridge::ProcessBridge;
use crate::bundler::ProcessCompiler;
use crate::case::CaseFile;
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results, update_outcome};
use crate::workspace::create_workspace;

/// Seconds before a bundler or runner invocation is killed, unless the
/// case overrides it.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Result of running a single case.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique identifier for this run.
    pub run_id: String,
    /// Path to the results directory.
    pub results_dir: PathBuf,
    /// Classified outcome.
    pub outcome: Outcome,
}

/// Run a case end-to-end: workspace, scenario loop, gate, result capture.
#[instrument(skip_all, fields(case_id = %case.case.id))]
pub fn run_case(
    root: &Path,
    case_path: &Path,
    case: &CaseFile,
    verbose: bool,
) -> Result<RunOutcome> {
    info!("case run started");

    debug!("creating workspace");
    let workspace_base = root.join("hotcase").join("workspaces");
    let workspace = create_workspace(&workspace_base, &case.case.id, &case.files)
        .context("create workspace")?;
    debug!(workspace = %workspace.name, "workspace created");

    let started_at = Utc::now();
    let run_id = format!("hot-{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let results_base = root.join("hotcase").join("results");
    let logs_dir = results_base.join(&case.case.id).join(&run_id).join("logs");

    let timeout = Duration::from_secs(case.config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let exchange_dir = workspace.root.join(".hotcase");
    let mut compiler = ProcessCompiler::new(
        case.config.bundler.command.clone(),
        exchange_dir.clone(),
        logs_dir.clone(),
        timeout,
    );
    let mut bridge = ProcessBridge::new(
        case.config.runner.command.clone(),
        exchange_dir,
        logs_dir,
        timeout,
    );

    let scenario = case.scenario(ScenarioContext {
        source: workspace.source.clone(),
        dist: workspace.dist.clone(),
    });
    let opts = HarnessOptions { verbose };

    debug!("running scenario");
    let scenario_result = run_scenario(&scenario, &mut compiler, &mut bridge, &opts);
    let finished_at = Utc::now();

    let (report, scenario_error) = match scenario_result {
        Ok(report) => (Some(report), None),
        Err(err) => (None, Some(format!("{err:#}"))),
    };
    let gate_error = report.as_ref().and_then(|report| {
        verify_full_consumption(&report.final_update, case.case.check_steps)
            .err()
            .map(|err| err.to_string())
    });

    let duration = finished_at - started_at;
    info!(
        scenario_error = ?scenario_error,
        duration_secs = duration.num_milliseconds() as f64 / 1000.0,
        "scenario finished"
    );

    debug!("capturing results");
    let capture_input = CaptureInput {
        case_id: &case.case.id,
        case_path,
        run_id: &run_id,
        started_at,
        finished_at,
        workspace_root: &workspace.root,
        scenario_error: scenario_error.as_deref(),
        gate_error: gate_error.as_deref(),
    };
    let results_dir =
        capture_results(&results_base, &capture_input, report.as_ref()).context("capture results")?;

    let outcome = classify_outcome(report.as_ref(), case.case.check_steps);
    update_outcome(&results_dir, outcome).context("update outcome")?;

    info!(outcome = ?outcome, results_dir = %results_dir.display(), "case run complete");

    Ok(RunOutcome {
        run_id,
        results_dir,
        outcome,
    })
}
