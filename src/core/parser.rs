//! Spec loading and structural validation.
//!
//! Parsing decodes every step into the typed action model; validation then
//! checks the constraints serde cannot express:
//! - `run` lists and argv vectors must be non-empty
//! - `write_file.path` must be non-empty
//! - `clone_repos` needs at least one destination
//! - every repo entry needs `url` or `name`

use super::types::*;
use crate::error::{ForgeError, Result};
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a spec file from disk.
pub fn parse_spec_file(path: &Path) -> Result<Spec> {
    if !path.exists() {
        return Err(ForgeError::SpecNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
    parse_spec(&content)
}

/// Parse a spec from a string. An empty document is an empty spec.
pub fn parse_spec(yaml: &str) -> Result<Spec> {
    if yaml.trim().is_empty() {
        return Ok(Spec::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| ForgeError::Config(format!("YAML parse error: {}", e)))
}

/// Parse and validate; any validation error is fatal.
pub fn load_spec(path: &Path) -> Result<Spec> {
    let spec = parse_spec_file(path)?;
    let errors = validate_spec(&spec);
    if errors.is_empty() {
        return Ok(spec);
    }
    let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
    Err(ForgeError::Config(format!(
        "{} validation error(s):\n  {}",
        errors.len(),
        messages.join("\n  ")
    )))
}

/// Validate a parsed spec. Returns a list of errors (empty = valid).
pub fn validate_spec(spec: &Spec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (idx, step) in spec.common.steps.iter().enumerate() {
        validate_step(&format!("common step {}", idx + 1), step, &mut errors);
    }
    for (os, section) in &spec.os {
        for (idx, step) in section.steps.iter().enumerate() {
            validate_step(&format!("os.{} step {}", os, idx + 1), step, &mut errors);
        }
    }

    errors
}

fn validate_step(location: &str, step: &Step, errors: &mut Vec<ValidationError>) {
    let label = match step.name {
        Some(ref name) => format!("{} ('{}')", location, name),
        None => location.to_string(),
    };
    let mut push = |message: String| errors.push(ValidationError { message });

    match &step.action {
        StepAction::WriteFile(wf) => {
            if wf.path.trim().is_empty() {
                push(format!("{}: write_file has an empty path", label));
            }
        }
        StepAction::CloneRepos(cr) => {
            let has_dest = [&cr.dest_unix, &cr.dest_windows]
                .iter()
                .any(|d| d.as_deref().is_some_and(|d| !d.trim().is_empty()));
            if !has_dest {
                push(format!(
                    "{}: clone_repos must specify dest_unix or dest_windows",
                    label
                ));
            }
            for (i, entry) in cr.repos.iter().enumerate() {
                let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
                if !present(&entry.url) && !present(&entry.name) {
                    push(format!(
                        "{}: repo entry {} must contain 'url' or 'name'",
                        label,
                        i + 1
                    ));
                }
                validate_items(&label, "post_install", &entry.post_install, &mut push);
            }
        }
        StepAction::Run(items) => {
            if items.is_empty() {
                push(format!("{}: run must be a non-empty list", label));
            }
            validate_items(&label, "run", items, &mut push);
        }
        StepAction::NoOp => {}
    }
}

fn validate_items(label: &str, field: &str, items: &[RunItem], push: &mut impl FnMut(String)) {
    for (i, item) in items.iter().enumerate() {
        if let RunItem::Argv(argv) = item {
            if argv.is_empty() {
                push(format!("{}: {} item {} has an empty argv", label, field, i + 1));
            }
        }
    }
}
