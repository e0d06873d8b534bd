//! Post-run certification that every scripted step was consumed.

use anyhow::{Result, bail};

use crate::ledger::UpdateSnapshot;

/// Fail unless the scenario consumed its whole scripted sequence.
///
/// A runner that stops asking for updates early would otherwise pass
/// trivially. The error is distinct from any assertion inside the executed
/// bundle, so a truncated scenario is never mistaken for a pass.
pub fn verify_full_consumption(update: &UpdateSnapshot, check_steps: bool) -> Result<()> {
    if !check_steps {
        return Ok(());
    }
    if update.step_index + 1 != update.total_steps {
        bail!(
            "ran {} of {} scripted update steps",
            update.step_index + 1,
            update.total_steps
        );
    }
    Ok(())
}
