//! `clone_repos` action handler.
//!
//! Clones are idempotent: an existing target directory is left untouched.
//! Post-install commands run inside the target with the step environment.

use crate::core::context::RunContext;
use crate::core::executor::StepRun;
use crate::core::repo;
use crate::core::types::CloneRepos;
use crate::error::{ForgeError, Result};
use crate::transport;
use std::io::Write;
use std::path::PathBuf;

/// Input consulted when a step has no `default_org`.
pub const DEFAULT_ORG_VAR: &str = "DEFAULT_ORG";

/// Destination root for the active OS, `~`-expanded.
pub fn destination(cr: &CloneRepos, ctx: &RunContext) -> Result<PathBuf> {
    let (dest, field) = if ctx.os.is_windows() {
        (cr.dest_windows.as_deref(), "dest_windows")
    } else {
        (cr.dest_unix.as_deref(), "dest_unix")
    };
    let dest = dest
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            ForgeError::Config(format!(
                "clone_repos must specify {} for OS '{}'",
                field, ctx.os
            ))
        })?;
    Ok(ctx.expand_path(dest))
}

/// Step-level `default_org`, else the `DEFAULT_ORG` input.
pub fn default_org<'a>(cr: &'a CloneRepos, ctx: &'a RunContext) -> Option<&'a str> {
    cr.default_org
        .as_deref()
        .filter(|o| !o.trim().is_empty())
        .or_else(|| ctx.vars.get(DEFAULT_ORG_VAR).map(String::as_str))
}

/// Check destination and every URL without touching anything.
pub fn preflight(cr: &CloneRepos, ctx: &RunContext) -> Result<()> {
    destination(cr, ctx)?;
    let org = default_org(cr, ctx);
    for entry in &cr.repos {
        repo::resolve_url(entry, org)?;
    }
    Ok(())
}

/// Perform a `clone_repos` step. Returns the number of recovered failures.
pub fn apply(cr: &CloneRepos, step: &StepRun, out: &mut dyn Write) -> Result<u32> {
    let dest_root = destination(cr, step.ctx)?;

    if step.dry_run {
        writeln!(
            out,
            "DRY-RUN clone_repos -> {} ({} repos)",
            dest_root.display(),
            cr.repos.len()
        )?;
        return Ok(0);
    }

    let org = default_org(cr, step.ctx);

    let mut recovered = 0;
    for entry in &cr.repos {
        let url = repo::resolve_url(entry, org)?;
        let target = dest_root.join(repo::target_dir_name(entry, &url));

        if target.exists() {
            tracing::info!(target = %target.display(), "skip clone: target exists");
        } else {
            tracing::info!(url = url.as_str(), target = %target.display(), "cloning");
            match step.cloner.clone_repo(&url, &target, Some(&step.env)) {
                Ok(()) => {}
                Err(ForgeError::Process(e)) => {
                    step.recover(&format!("git clone {}", url), e)?;
                    recovered += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        for item in &entry.post_install {
            let result = transport::run_item(
                step.executor,
                item,
                step.shell,
                Some(&target),
                Some(&step.env),
            );
            if let Err(e) = result {
                step.recover(&format!("post_install for {}", url), e)?;
                recovered += 1;
                break;
            }
        }
    }
    Ok(recovered)
}
