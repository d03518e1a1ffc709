//! Process execution: argv and platform-shell invocation, plus git clones.

pub mod git;
pub mod local;

use crate::core::types::{RunItem, ShellKind, Vars};
use crate::error::ProcessError;
use std::path::Path;

/// Runs commands to completion. Implementations must fail with
/// [`ProcessError`] on a nonzero exit.
pub trait ProcessExecutor {
    /// Run `argv[0]` with the remaining elements as literal arguments. No shell.
    fn run_argv(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        env: Option<&Vars>,
    ) -> Result<i32, ProcessError>;

    /// Run a command string under the given shell.
    fn run_shell(
        &self,
        command: &str,
        shell: ShellKind,
        cwd: Option<&Path>,
        env: Option<&Vars>,
    ) -> Result<i32, ProcessError>;
}

/// Full invocation for a shell command string.
pub fn shell_invocation(command: &str, shell: ShellKind) -> Vec<String> {
    let prefix: &[&str] = match shell {
        ShellKind::Posix => &["bash", "-lc"],
        ShellKind::Powershell => &[
            "powershell",
            "-NoProfile",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
        ],
    };
    prefix
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(command.to_string()))
        .collect()
}

/// Dispatch a run-item: argv items never touch a shell; strings always do.
pub fn run_item(
    executor: &dyn ProcessExecutor,
    item: &RunItem,
    shell: ShellKind,
    cwd: Option<&Path>,
    env: Option<&Vars>,
) -> Result<i32, ProcessError> {
    match item {
        RunItem::Argv(argv) => {
            tracing::debug!(?argv, "exec argv");
            executor.run_argv(argv, cwd, env)
        }
        RunItem::Shell(command) => {
            tracing::debug!(%shell, command = command.as_str(), "exec shell");
            executor.run_shell(command, shell, cwd, env)
        }
    }
}
