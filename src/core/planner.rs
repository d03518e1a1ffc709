//! Plan generation: resolve OS, context and guards without executing.

use super::condition;
use super::context::RunContext;
use super::executor;
use super::resolver::Interpolate;
use super::types::*;
use serde::Serialize;
use std::path::PathBuf;

/// Where a step was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    Common,
    Os,
}

/// One step as it would be dispatched.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub index: usize,
    pub name: String,
    pub source: StepSource,
    pub action: &'static str,
    pub description: String,
    pub will_run: bool,
}

/// Ordered preview of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub os: String,
    pub workspace_root: Option<PathBuf>,
    /// A run would abort at the workspace-root guard
    pub blocked: bool,
    pub steps: Vec<PlannedStep>,
}

impl Plan {
    pub fn will_run(&self) -> usize {
        self.steps.iter().filter(|s| s.will_run).count()
    }
}

/// Build the plan for `spec` under `ctx`.
pub fn plan(spec: &Spec, ctx: &RunContext) -> Plan {
    let vars = ctx.step_vars();
    let common_len = spec.common.steps.len();

    let steps = spec
        .steps_for(&ctx.os)
        .enumerate()
        .map(|(idx, raw)| {
            let step = raw.interpolate(&vars);
            let will_run = step
                .when
                .as_deref()
                .map_or(true, |when| condition::evaluate(when, &vars));
            PlannedStep {
                index: idx + 1,
                name: step.display_name(idx + 1),
                source: if idx < common_len {
                    StepSource::Common
                } else {
                    StepSource::Os
                },
                action: step.action.kind(),
                description: describe_action(&step.action, ctx),
                will_run,
            }
        })
        .collect();

    Plan {
        os: ctx.os.to_string(),
        workspace_root: ctx.workspace_root(),
        blocked: executor::check_workspace_root(ctx).is_err(),
        steps,
    }
}

/// Human-readable summary of what an action would do.
fn describe_action(action: &StepAction, ctx: &RunContext) -> String {
    match action {
        StepAction::WriteFile(wf) => {
            let verb = if wf.append { "append to" } else { "write" };
            format!("{} {}", verb, ctx.expand_path(&wf.path).display())
        }
        StepAction::CloneRepos(cr) => {
            let dest = if ctx.os.is_windows() {
                cr.dest_windows.as_deref()
            } else {
                cr.dest_unix.as_deref()
            };
            match dest {
                Some(d) => format!(
                    "clone {} repos into {}",
                    cr.repos.len(),
                    ctx.expand_path(d).display()
                ),
                None => format!("clone {} repos (no destination for {})", cr.repos.len(), ctx.os),
            }
        }
        StepAction::Run(items) => match items.as_slice() {
            [only] => format!("run {}", only),
            _ => format!("run {} commands", items.len()),
        },
        StepAction::NoOp => "no-op".to_string(),
    }
}
