//! Scenario orchestration: the sequential build -> locate -> run -> advance
//! cycle for one test case.
//!
//! Ordering between steps is a correctness requirement (the bundler's HMR
//! runtime must observe updates in script order), so the loop is strictly
//! sequential: no rebuild starts before the previous step's bundles were
//! located and executed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::compiler::Compiler;
use crate::config::{ConfigOverrides, HarnessOptions, synthesize};
use crate::ledger::{UpdateLedger, UpdateSnapshot};
use crate::locate::{BundleSelection, locate_bundles};
use crate::target::Target;

/// Source and output roots for one case workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioContext {
    pub source: PathBuf,
    pub dist: PathBuf,
}

/// One scripted mutation: source-relative files rewritten before the next
/// build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateStep {
    pub files: BTreeMap<String, String>,
}

/// A complete scripted hot-update scenario for one test case.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: String,
    pub context: ScenarioContext,
    pub target: Target,
    /// Gate on full consumption of the scripted steps.
    pub check_steps: bool,
    pub overrides: ConfigOverrides,
    /// Mutations applied after the initial build, one per rebuild.
    pub steps: Vec<UpdateStep>,
}

impl Scenario {
    /// Builds expected for the scenario: the initial one plus one per
    /// scripted mutation.
    pub fn total_steps(&self) -> usize {
        self.steps.len() + 1
    }
}

/// Executes located bundles in the target's simulated environment.
pub trait RunnerBridge {
    fn execute(&mut self, selection: &BundleSelection, dist: &Path) -> Result<RunVerdict>;
}

/// Pass/fail reported by one execution of the located bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunVerdict {
    pub passed: bool,
    /// The executed bundle declared it will consume no further updates.
    #[serde(default)]
    pub halted: bool,
    /// Assertion failures, surfaced verbatim.
    #[serde(default)]
    pub failures: Vec<String>,
}

impl RunVerdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            halted: false,
            failures: Vec::new(),
        }
    }
}

/// Record of one build/locate/run cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_index: usize,
    pub changed_files: Vec<String>,
    pub selection: BundleSelection,
    pub verdict: RunVerdict,
}

/// Everything observed while running a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepRecord>,
    /// Ledger state after the last build, for the completion gate.
    pub final_update: UpdateSnapshot,
}

impl ScenarioReport {
    pub fn all_passed(&self) -> bool {
        self.steps.iter().all(|step| step.verdict.passed)
    }
}

/// Run the scenario to completion or first stop condition.
///
/// Returns `Err` only for integration defects (build, locator, or file
/// staging failures) and ledger misuse; assertion failures are recorded per
/// step. The completion gate is a separate, final-phase check over
/// [`ScenarioReport::final_update`].
#[instrument(skip_all, fields(scenario_id = %scenario.id))]
pub fn run_scenario<C: Compiler, B: RunnerBridge>(
    scenario: &Scenario,
    compiler: &mut C,
    bridge: &mut B,
    opts: &HarnessOptions,
) -> Result<ScenarioReport> {
    let mut ledger = UpdateLedger::new(scenario.total_steps())?;
    let mut records = Vec::with_capacity(scenario.total_steps());
    let mut pending = scenario.steps.iter();

    loop {
        let update = ledger.snapshot();
        debug!(step = update.step_index, "building");
        let config = synthesize(
            &scenario.context,
            scenario.target,
            &scenario.overrides,
            &update,
            opts,
        );
        let report = compiler
            .build(&config)
            .with_context(|| format!("build for step {}", update.step_index))?;
        let selection = locate_bundles(&report, scenario.target)
            .with_context(|| format!("locate bundles for step {}", update.step_index))?;
        debug!(step = update.step_index, files = selection.files().count(), "executing bundles");
        let verdict = bridge
            .execute(&selection, &scenario.context.dist)
            .with_context(|| format!("execute bundles for step {}", update.step_index))?;

        let stop = !verdict.passed || verdict.halted;
        records.push(StepRecord {
            step_index: update.step_index,
            changed_files: update.changed_files.clone(),
            selection,
            verdict,
        });
        if stop || ledger.is_exhausted() {
            break;
        }

        let step = pending
            .next()
            .ok_or_else(|| anyhow!("scripted steps out of sync with ledger"))?;
        stage_update(&scenario.context.source, step)
            .with_context(|| format!("stage update for step {}", ledger.step_index() + 1))?;
        ledger.advance(step.files.keys().cloned().collect())?;
    }

    let final_update = ledger.snapshot();
    info!(
        consumed = final_update.step_index + 1,
        total = final_update.total_steps,
        "scenario finished"
    );
    Ok(ScenarioReport {
        steps: records,
        final_update,
    })
}

/// Write one scripted step's files into the source root.
fn stage_update(source_root: &Path, step: &UpdateStep) -> Result<()> {
    for (relative, contents) in &step.files {
        let path = source_root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}
