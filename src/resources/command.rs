//! `run` action handler.

use crate::core::executor::StepRun;
use crate::core::types::RunItem;
use crate::error::Result;
use crate::transport;
use std::io::Write;

/// Execute run-items strictly in order. Returns the number of failures
/// absorbed by `continue_on_error`.
pub fn apply(items: &[RunItem], step: &StepRun, out: &mut dyn Write) -> Result<u32> {
    if step.dry_run {
        for item in items {
            writeln!(out, "DRY-RUN run -> {}", item)?;
        }
        return Ok(0);
    }

    let mut recovered = 0;
    for item in items {
        let result = transport::run_item(
            step.executor,
            item,
            step.shell,
            step.workdir.as_deref(),
            Some(&step.env),
        );
        if let Err(e) = result {
            step.recover("run item", e)?;
            recovered += 1;
        }
    }
    Ok(recovered)
}
