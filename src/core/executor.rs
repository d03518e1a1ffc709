//! Step engine and run orchestration.
//!
//! load spec → build context/environment → workspace-root guard → for each
//! step (common, then OS): interpolate → guard → banner → dispatch action.
//! Execution is strictly sequential. A failure not absorbed by
//! `continue_on_error` ends the run; earlier side effects stay in place.

use super::condition;
use super::context::{RunContext, RunnerConfig};
use super::parser;
use super::resolver::Interpolate;
use super::types::*;
use crate::error::{ForgeError, ProcessError, Result};
use crate::resources;
use crate::transport::git::RepoCloner;
use crate::transport::ProcessExecutor;
use indexmap::IndexMap;
use std::io::Write;
use std::path::PathBuf;

/// Options for one invocation of `run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub spec_path: PathBuf,
    pub dry_run: bool,
    pub overrides: IndexMap<String, String>,
}

/// Counters reported after a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: u32,
    pub skipped: u32,
    pub recovered: u32,
}

/// Per-step execution scope handed to action handlers.
pub struct StepRun<'a> {
    pub ctx: &'a RunContext,
    pub executor: &'a dyn ProcessExecutor,
    pub cloner: &'a dyn RepoCloner,
    pub shell: ShellKind,
    pub workdir: Option<PathBuf>,
    /// Merged environment plus step-local overrides
    pub env: Vars,
    pub continue_on_error: bool,
    pub dry_run: bool,
}

impl StepRun<'_> {
    /// Absorb a process failure when `continue_on_error` is set.
    pub fn recover(&self, what: &str, err: ProcessError) -> Result<()> {
        if self.continue_on_error {
            tracing::warn!(error = %err, "{} failed; continue_on_error=true -> continuing", what);
            Ok(())
        } else {
            Err(err.into())
        }
    }
}

/// Drives steps against injected process and clone capabilities.
pub struct StepEngine<'a> {
    pub ctx: &'a RunContext,
    pub executor: &'a dyn ProcessExecutor,
    pub cloner: &'a dyn RepoCloner,
    pub dry_run: bool,
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Guard was false; nothing printed
    Skipped,
    /// Ran to completion, absorbing `recovered` failures
    Completed { recovered: u32 },
}

impl StepEngine<'_> {
    /// Run one step. `index` is 1-based.
    pub fn run_step(&self, index: usize, raw: &Step, out: &mut dyn Write) -> Result<StepOutcome> {
        let vars = self.ctx.step_vars();
        let step = raw.interpolate(&vars);

        if let Some(ref when) = step.when {
            if !condition::evaluate(when, &vars) {
                tracing::debug!(step = index, "guard false; skipping");
                return Ok(StepOutcome::Skipped);
            }
        }

        let name = step.display_name(index);
        writeln!(out, "\n--- [{}] ---", name)?;

        let mut env = self.ctx.env.clone();
        env.extend(
            step.env
                .iter()
                .map(|(k, v)| (k.clone(), yaml_value_to_string(v))),
        );

        let scope = StepRun {
            ctx: self.ctx,
            executor: self.executor,
            cloner: self.cloner,
            shell: step.shell.unwrap_or_else(|| self.ctx.os.default_shell()),
            workdir: step
                .workdir
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(|w| self.ctx.expand_path(w)),
            env,
            continue_on_error: step.continue_on_error,
            dry_run: self.dry_run,
        };

        let recovered = match &step.action {
            StepAction::WriteFile(wf) => resources::file::apply(wf, &scope, out)?,
            StepAction::CloneRepos(cr) => resources::repos::apply(cr, &scope, out)?,
            StepAction::Run(items) => resources::command::apply(items, &scope, out)?,
            StepAction::NoOp => {
                writeln!(out, "No-op step")?;
                0
            }
        };
        Ok(StepOutcome::Completed { recovered })
    }

    /// Surface config errors in steps that will run before any step starts.
    pub fn preflight(&self, steps: &[&Step]) -> Result<()> {
        let vars = self.ctx.step_vars();
        for raw in steps {
            let step = raw.interpolate(&vars);
            if step
                .when
                .as_deref()
                .is_some_and(|when| !condition::evaluate(when, &vars))
            {
                continue;
            }
            if let StepAction::CloneRepos(ref cr) = step.action {
                resources::repos::preflight(cr, self.ctx)?;
            }
        }
        Ok(())
    }

    /// Run steps in order, stopping at the first unrecovered failure.
    pub fn run_all(&self, steps: &[&Step], out: &mut dyn Write) -> Result<RunSummary> {
        self.preflight(steps)?;
        let mut summary = RunSummary::default();
        for (idx, step) in steps.iter().enumerate() {
            match self.run_step(idx + 1, step, out)? {
                StepOutcome::Skipped => summary.skipped += 1,
                StepOutcome::Completed { recovered } => {
                    summary.executed += 1;
                    summary.recovered += recovered;
                }
            }
        }
        writeln!(out, "\nAll steps complete.")?;
        Ok(summary)
    }
}

/// Abort when the OS's workspace-root input names an existing path.
pub fn check_workspace_root(ctx: &RunContext) -> Result<()> {
    match ctx.workspace_root() {
        Some(root) if root.exists() => Err(ForgeError::WorkspaceExists(root)),
        _ => Ok(()),
    }
}

/// Execute an already-loaded spec.
pub fn execute(
    spec: &Spec,
    opts: &RunOptions,
    config: &RunnerConfig,
    executor: &dyn ProcessExecutor,
    cloner: &dyn RepoCloner,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let ctx = RunContext::build(spec, &opts.overrides, config);
    tracing::debug!(os = %ctx.os, dry_run = opts.dry_run, "starting run");

    check_workspace_root(&ctx)?;

    let engine = StepEngine {
        ctx: &ctx,
        executor,
        cloner,
        dry_run: opts.dry_run,
    };
    let steps: Vec<&Step> = spec.steps_for(&ctx.os).collect();
    let summary = engine.run_all(&steps, out)?;
    tracing::info!(
        executed = summary.executed,
        skipped = summary.skipped,
        recovered = summary.recovered,
        "run finished"
    );
    Ok(summary)
}

/// Load the spec at `opts.spec_path` and execute it.
pub fn run_spec(
    opts: &RunOptions,
    config: &RunnerConfig,
    executor: &dyn ProcessExecutor,
    cloner: &dyn RepoCloner,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let spec = parser::load_spec(&opts.spec_path)?;
    execute(&spec, opts, config, executor, cloner, out)
}
