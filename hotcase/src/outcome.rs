use serde::{Deserialize, Serialize};

use harness::gate::verify_full_consumption;
use harness::scenario::ScenarioReport;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every verdict passed and the scripted sequence was fully consumed.
    Success,
    /// An assertion inside an executed bundle failed.
    Fail,
    /// All verdicts passed but the scenario stopped before consuming every
    /// scripted step.
    Incomplete,
    /// Integration defect: the scenario could not run to a verdict at all.
    Error,
}

pub fn classify_outcome(report: Option<&ScenarioReport>, check_steps: bool) -> Outcome {
    let Some(report) = report else {
        return Outcome::Error;
    };
    if !report.all_passed() {
        return Outcome::Fail;
    }
    if verify_full_consumption(&report.final_update, check_steps).is_err() {
        return Outcome::Incomplete;
    }
    Outcome::Success
}
