use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use harness::scenario::ScenarioReport;

use crate::outcome::Outcome;
use crate::results::RunMeta;

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub runs: usize,
    pub success: usize,
    pub fail: usize,
    pub incomplete: usize,
    pub error: usize,
    pub avg_duration_secs: Option<f64>,
    /// Per step index: (runs where the verdict passed, runs that reached it).
    pub step_pass_rates: BTreeMap<usize, (usize, usize)>,
}

pub fn load_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn aggregate(case_results_dir: &Path) -> Result<(ReportSummary, Vec<String>)> {
    let mut summary = ReportSummary::default();
    let mut warnings = Vec::new();

    for run_dir in load_run_dirs(case_results_dir)? {
        let meta_path = run_dir.join("meta.json");
        let meta: RunMeta = match fs::read_to_string(&meta_path)
            .with_context(|| format!("read {}", meta_path.display()))
            .and_then(|contents| serde_json::from_str(&contents).context("parse meta"))
        {
            Ok(meta) => meta,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: meta.json invalid ({err})",
                    run_dir.display()
                ));
                continue;
            }
        };

        summary.runs += 1;
        match meta.outcome {
            Some(Outcome::Success) => summary.success += 1,
            Some(Outcome::Fail) => summary.fail += 1,
            Some(Outcome::Incomplete) => summary.incomplete += 1,
            Some(Outcome::Error) | None => summary.error += 1,
        }

        summary.avg_duration_secs = Some(match summary.avg_duration_secs {
            None => meta.duration_secs,
            Some(avg) => {
                let total = avg * (summary.runs as f64 - 1.0) + meta.duration_secs;
                total / summary.runs as f64
            }
        });

        // An errored run has no report; that is already counted above.
        let report_path = run_dir.join("report.json");
        if let Ok(contents) = fs::read_to_string(&report_path) {
            match serde_json::from_str::<ScenarioReport>(&contents) {
                Ok(report) => update_step_pass_rates(&mut summary.step_pass_rates, &report),
                Err(err) => warnings.push(format!(
                    "skip {}: report.json invalid ({err})",
                    run_dir.display()
                )),
            }
        }
    }

    Ok((summary, warnings))
}

fn update_step_pass_rates(
    stats: &mut BTreeMap<usize, (usize, usize)>,
    report: &ScenarioReport,
) {
    for step in &report.steps {
        let entry = stats.entry(step.step_index).or_insert((0, 0));
        if step.verdict.passed {
            entry.0 += 1;
        }
        entry.1 += 1;
    }
}
