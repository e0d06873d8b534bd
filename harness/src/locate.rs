//! Bundle selection out of a completed build report.
//!
//! Selection failures signal a harness/bundler integration defect, never a
//! recoverable test condition: an empty selection must not be silently
//! treated as success.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::compiler::{BuildReport, MAIN_ENTRYPOINT};
use crate::target::{SelectionPolicy, Target};

/// Ordered output files a runner must load for one step: companion assets
/// (stylesheets, manifests) first, then executable scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSelection {
    pub companions: Vec<String>,
    pub executables: Vec<String>,
}

impl BundleSelection {
    /// All selected files, in load order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.companions
            .iter()
            .chain(&self.executables)
            .map(String::as_str)
    }
}

/// Select the output files to load for the current step.
pub fn locate_bundles(report: &BuildReport, target: Target) -> Result<BundleSelection> {
    let entrypoint = report
        .entrypoints
        .get(MAIN_ENTRYPOINT)
        .ok_or_else(|| anyhow!("build report has no `{MAIN_ENTRYPOINT}` entrypoint"))?;

    let mut selection = BundleSelection::default();
    match target.selection_policy() {
        SelectionPolicy::CompanionsThenScripts => {
            for asset in &entrypoint.assets {
                if asset.is_executable() {
                    selection.executables.push(asset.name.clone());
                } else {
                    selection.companions.push(asset.name.clone());
                }
            }
        }
        SelectionPolicy::LastScriptOnly => {
            let last = entrypoint
                .assets
                .iter()
                .rev()
                .find(|asset| asset.is_executable())
                .ok_or_else(|| {
                    anyhow!("no executable asset in `{MAIN_ENTRYPOINT}` entrypoint")
                })?;
            selection.executables.push(last.name.clone());
        }
    }
    Ok(selection)
}
