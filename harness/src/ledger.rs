//! Scripted hot-update bookkeeping.
//!
//! The ledger is the single mutable record of which scripted update is in
//! flight. It has exactly one writer (the scenario loop, between builds);
//! every other consumer reads by-value [`UpdateSnapshot`]s, so no build ever
//! observes a half-applied step.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Read-only view of the ledger, handed by value into each build invocation.
///
/// Serialized verbatim as the injected loader's options, which is how the
/// bundler's HMR runtime learns "what changed, at which step" without the
/// harness inspecting bundler internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSnapshot {
    /// Index of the update currently being applied.
    pub step_index: usize,
    /// Number of scripted builds expected for the case.
    pub total_steps: usize,
    /// Source-relative paths mutated for the step in progress.
    pub changed_files: Vec<String>,
}

/// Mutable step record for one test case. Single-threaded, single-owner.
#[derive(Debug)]
pub struct UpdateLedger {
    step_index: usize,
    total_steps: usize,
    changed_files: Vec<String>,
}

impl UpdateLedger {
    /// Create a ledger expecting `total_steps` builds. The initial build
    /// counts as step 0, so `total_steps` must be at least 1.
    pub fn new(total_steps: usize) -> Result<Self> {
        if total_steps == 0 {
            bail!("a scenario needs at least one step");
        }
        Ok(Self {
            step_index: 0,
            total_steps,
            changed_files: Vec::new(),
        })
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// True once the ledger sits on the final scripted step.
    pub fn is_exhausted(&self) -> bool {
        self.step_index + 1 == self.total_steps
    }

    pub fn snapshot(&self) -> UpdateSnapshot {
        UpdateSnapshot {
            step_index: self.step_index,
            total_steps: self.total_steps,
            changed_files: self.changed_files.clone(),
        }
    }

    /// Move to the next scripted step, replacing the changed-file set.
    ///
    /// Advancing past the last step is a scripting bug in the fixture, not a
    /// recoverable test condition.
    pub fn advance(&mut self, changed_files: Vec<String>) -> Result<()> {
        if self.is_exhausted() {
            bail!(
                "no scripted update left to advance into ({} of {} consumed)",
                self.step_index + 1,
                self.total_steps
            );
        }
        self.step_index += 1;
        self.changed_files = changed_files;
        Ok(())
    }
}
