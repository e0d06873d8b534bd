//! Result capture and persistence.
//!
//! Writes run metadata and the serialized scenario report to the results
//! directory for later aggregation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use harness::scenario::ScenarioReport;

use crate::outcome::Outcome;

/// Input for capturing results from a completed run.
#[derive(Debug)]
pub struct CaptureInput<'a> {
    pub case_id: &'a str,
    pub case_path: &'a Path,
    pub run_id: &'a str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workspace_root: &'a Path,
    /// Integration defect that aborted the scenario, if any.
    pub scenario_error: Option<&'a str>,
    /// Completion-gate rejection, if any.
    pub gate_error: Option<&'a str>,
}

/// Metadata for a run, persisted to `meta.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunMeta {
    pub case_id: String,
    pub run_id: String,
    /// SHA-256 hash of the case file for reproducibility tracking.
    pub case_hash: String,
    pub outcome: Option<Outcome>,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
    pub workspace: String,
    pub scenario_error: Option<String>,
    pub gate_error: Option<String>,
    /// Non-fatal errors encountered during capture.
    pub errors: Vec<String>,
}

/// Capture results from a completed run to the results directory.
#[instrument(skip_all, fields(case_id = %input.case_id, run_id = %input.run_id))]
pub fn capture_results(
    base_dir: &Path,
    input: &CaptureInput<'_>,
    report: Option<&ScenarioReport>,
) -> Result<PathBuf> {
    let results_dir = results_dir(base_dir, input.case_id, input.run_id);
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("create results dir {}", results_dir.display()))?;

    let mut errors = Vec::new();

    let case_hash = match file_sha256(input.case_path) {
        Ok(hash) => hash,
        Err(err) => {
            errors.push(format!("case hash: {err}"));
            String::new()
        }
    };

    if let Some(report) = report
        && let Err(err) = write_report(&results_dir.join("report.json"), report)
    {
        errors.push(format!("report: {err}"));
    }

    if !errors.is_empty() {
        warn!(errors = ?errors, "artifact capture had errors");
    }

    let duration = input.finished_at - input.started_at;
    let meta = RunMeta {
        case_id: input.case_id.to_string(),
        run_id: input.run_id.to_string(),
        case_hash,
        outcome: None,
        start_time: input.started_at.to_rfc3339(),
        end_time: input.finished_at.to_rfc3339(),
        duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        workspace: input.workspace_root.display().to_string(),
        scenario_error: input.scenario_error.map(str::to_string),
        gate_error: input.gate_error.map(str::to_string),
        errors,
    };

    write_meta(&results_dir.join("meta.json"), &meta)?;
    debug!(results_dir = %results_dir.display(), "results captured");
    Ok(results_dir)
}

pub fn update_outcome(results_dir: &Path, outcome: Outcome) -> Result<()> {
    let meta_path = results_dir.join("meta.json");
    let mut meta: RunMeta = serde_json::from_str(
        &fs::read_to_string(&meta_path).with_context(|| format!("read {}", meta_path.display()))?,
    )
    .context("parse meta")?;
    meta.outcome = Some(outcome);
    write_meta(&meta_path, &meta)?;
    Ok(())
}

pub fn results_dir(base_dir: &Path, case_id: &str, run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(run_id)
}

fn write_meta(path: &Path, meta: &RunMeta) -> Result<()> {
    let contents = serde_json::to_string_pretty(meta).context("serialize meta")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write meta {}", path.display()))?;
    Ok(())
}

fn write_report(path: &Path, report: &ScenarioReport) -> Result<()> {
    let contents = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use harness::ledger::UpdateSnapshot;

    fn sample_report() -> ScenarioReport {
        ScenarioReport {
            steps: Vec::new(),
            final_update: UpdateSnapshot {
                step_index: 0,
                total_steps: 1,
                changed_files: Vec::new(),
            },
        }
    }

    #[test]
    fn results_dir_is_stable() {
        let base = Path::new("/tmp/results");
        let dir = results_dir(base, "case", "hot-1");
        assert_eq!(dir, PathBuf::from("/tmp/results/case/hot-1"));
    }

    #[test]
    fn captures_meta_and_report() {
        let temp = tempdir().expect("tempdir");
        let case_path = temp.path().join("case.toml");
        fs::write(&case_path, "[case]\nid='case'\n").expect("case file");

        let input = CaptureInput {
            case_id: "case",
            case_path: &case_path,
            run_id: "hot-1",
            started_at: Utc::now(),
            finished_at: Utc::now(),
            workspace_root: temp.path(),
            scenario_error: None,
            gate_error: Some("ran 1 of 2 scripted update steps"),
        };
        let dir =
            capture_results(temp.path(), &input, Some(&sample_report())).expect("capture");
        assert!(dir.join("meta.json").exists());
        assert!(dir.join("report.json").exists());

        let meta: RunMeta =
            serde_json::from_str(&fs::read_to_string(dir.join("meta.json")).expect("meta"))
                .expect("parse meta");
        assert_eq!(meta.case_id, "case");
        assert!(!meta.case_hash.is_empty());
        assert!(meta.errors.is_empty());
        assert_eq!(
            meta.gate_error.as_deref(),
            Some("ran 1 of 2 scripted update steps")
        );
        assert!(meta.outcome.is_none());
    }

    #[test]
    fn outcome_is_patched_into_meta() {
        let temp = tempdir().expect("tempdir");
        let case_path = temp.path().join("case.toml");
        fs::write(&case_path, "[case]\nid='case'\n").expect("case file");

        let input = CaptureInput {
            case_id: "case",
            case_path: &case_path,
            run_id: "hot-1",
            started_at: Utc::now(),
            finished_at: Utc::now(),
            workspace_root: temp.path(),
            scenario_error: None,
            gate_error: None,
        };
        let dir = capture_results(temp.path(), &input, None).expect("capture");
        update_outcome(&dir, Outcome::Success).expect("update");

        let meta: RunMeta =
            serde_json::from_str(&fs::read_to_string(dir.join("meta.json")).expect("meta"))
                .expect("parse meta");
        assert_eq!(meta.outcome, Some(Outcome::Success));
    }
}
