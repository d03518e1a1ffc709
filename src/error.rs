//! Error taxonomy for spec loading and step execution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a run.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Malformed spec: missing field, wrong shape, unresolvable repo URL
    #[error("config error: {0}")]
    Config(String),

    /// Spec file does not exist
    #[error("spec file not found: {}", .0.display())]
    SpecNotFound(PathBuf),

    /// Workspace root pre-exists; refusing to bootstrap over it
    #[error("Workspace root already exists: {}", .0.display())]
    WorkspaceExists(PathBuf),

    /// A spawned command failed and was not absorbed by continue_on_error
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Filesystem failure while performing a step
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure writing user-facing output
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl ForgeError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForgeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A spawned process could not be started or exited unsuccessfully.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` failed with {}", describe_code(*.code))]
    Failed { command: String, code: Option<i32> },
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {}", c),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
