//! Local execution via `std::process::Command`.
//!
//! Child stdio is inherited so command output streams straight to the user.

use super::{shell_invocation, ProcessExecutor};
use crate::core::types::{ShellKind, Vars};
use crate::error::ProcessError;
use std::path::Path;
use std::process::Command;

/// Runs commands on this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    fn exec(
        &self,
        argv: &[String],
        display: &str,
        cwd: Option<&Path>,
        env: Option<&Vars>,
    ) -> Result<i32, ProcessError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ProcessError::Spawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
            });
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        if let Some(vars) = env {
            cmd.env_clear().envs(vars);
        }

        let status = cmd.status().map_err(|e| ProcessError::Spawn {
            program: program.clone(),
            source: e,
        })?;

        if status.success() {
            Ok(0)
        } else {
            Err(ProcessError::Failed {
                command: display.to_string(),
                code: status.code(),
            })
        }
    }
}

impl ProcessExecutor for LocalExecutor {
    fn run_argv(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        env: Option<&Vars>,
    ) -> Result<i32, ProcessError> {
        self.exec(argv, &argv.join(" "), cwd, env)
    }

    fn run_shell(
        &self,
        command: &str,
        shell: ShellKind,
        cwd: Option<&Path>,
        env: Option<&Vars>,
    ) -> Result<i32, ProcessError> {
        self.exec(&shell_invocation(command, shell), command, cwd, env)
    }
}
