//! Git clone capability.
//!
//! Uses the `git` binary through a [`ProcessExecutor`], argv form only.

use super::ProcessExecutor;
use crate::core::types::Vars;
use crate::error::{ForgeError, Result};
use std::path::Path;

/// Clones a repository into a destination directory.
pub trait RepoCloner {
    /// `env`, when given, replaces the inherited environment of the clone.
    fn clone_repo(&self, url: &str, dest: &Path, env: Option<&Vars>) -> Result<()>;
}

/// `git clone <url> <dest>` via an executor.
pub struct GitCli<'a> {
    pub executor: &'a dyn ProcessExecutor,
}

impl<'a> GitCli<'a> {
    pub fn new(executor: &'a dyn ProcessExecutor) -> Self {
        Self { executor }
    }
}

impl RepoCloner for GitCli<'_> {
    fn clone_repo(&self, url: &str, dest: &Path, env: Option<&Vars>) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
        }
        let argv = vec![
            "git".to_string(),
            "clone".to_string(),
            url.to_string(),
            dest.display().to_string(),
        ];
        self.executor.run_argv(&argv, None, env)?;
        Ok(())
    }
}
