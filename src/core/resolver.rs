//! Variable interpolation.
//!
//! Replaces `{{NAME}}` and `${NAME}` with values from a flat variable bag.
//! Unknown names resolve to the empty string. Substituted values are scanned
//! again so nested references expand, up to [`MAX_PASSES`] rounds; a
//! self-referential value stops there instead of looping forever.

use super::types::*;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Upper bound on re-scan rounds for a single string.
pub const MAX_PASSES: usize = 16;

static MUSTACHE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("static pattern")
});

static DOLLAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern"));

/// Whether `s` still contains a variable reference.
pub fn has_reference(s: &str) -> bool {
    MUSTACHE.is_match(s) || DOLLAR.is_match(s)
}

/// Resolve all variable references in a string.
pub fn interpolate_str(template: &str, vars: &Vars) -> String {
    let budget = expansion_budget(template, vars);
    let mut current = template.to_string();
    for _ in 0..MAX_PASSES {
        if !has_reference(&current) {
            return current;
        }
        if current.len() > budget {
            break;
        }
        current = expand_once(&current, vars);
    }
    if has_reference(&current) {
        tracing::warn!(
            template,
            len = current.len(),
            "interpolation stopped after {} passes; unresolved references remain",
            MAX_PASSES
        );
    }
    current
}

/// Length past which re-scanning stops. Values that reference themselves
/// more than once grow geometrically; legitimate nesting stays well below.
fn expansion_budget(template: &str, vars: &Vars) -> usize {
    let values: usize = vars.values().map(String::len).sum();
    template
        .len()
        .saturating_add(values)
        .saturating_mul(MAX_PASSES)
}

fn expand_once(s: &str, vars: &Vars) -> String {
    let lookup = |caps: &Captures<'_>| vars.get(&caps[1]).cloned().unwrap_or_default();
    let mustache = MUSTACHE.replace_all(s, &lookup);
    DOLLAR.replace_all(&mustache, &lookup).into_owned()
}

/// Structures whose string leaves can be interpolated, preserving shape.
pub trait Interpolate {
    fn interpolate(&self, vars: &Vars) -> Self;
}

impl Interpolate for String {
    fn interpolate(&self, vars: &Vars) -> Self {
        interpolate_str(self, vars)
    }
}

impl<T: Interpolate> Interpolate for Option<T> {
    fn interpolate(&self, vars: &Vars) -> Self {
        self.as_ref().map(|v| v.interpolate(vars))
    }
}

impl<T: Interpolate> Interpolate for Vec<T> {
    fn interpolate(&self, vars: &Vars) -> Self {
        self.iter().map(|v| v.interpolate(vars)).collect()
    }
}

impl<T: Interpolate> Interpolate for IndexMap<String, T> {
    fn interpolate(&self, vars: &Vars) -> Self {
        self.iter()
            .map(|(k, v)| (k.clone(), v.interpolate(vars)))
            .collect()
    }
}

impl Interpolate for serde_yaml_ng::Value {
    fn interpolate(&self, vars: &Vars) -> Self {
        use serde_yaml_ng::Value;
        match self {
            Value::String(s) => Value::String(interpolate_str(s, vars)),
            Value::Sequence(items) => Value::Sequence(items.iter().map(|v| v.interpolate(vars)).collect()),
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.interpolate(vars)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl Interpolate for RunItem {
    fn interpolate(&self, vars: &Vars) -> Self {
        match self {
            Self::Shell(cmd) => Self::Shell(cmd.interpolate(vars)),
            Self::Argv(argv) => Self::Argv(argv.interpolate(vars)),
        }
    }
}

impl Interpolate for WriteFile {
    fn interpolate(&self, vars: &Vars) -> Self {
        Self {
            path: self.path.interpolate(vars),
            content: self.content.interpolate(vars),
            mode: self.mode.interpolate(vars),
            append: self.append,
        }
    }
}

impl Interpolate for RepoEntry {
    fn interpolate(&self, vars: &Vars) -> Self {
        Self {
            name: self.name.interpolate(vars),
            url: self.url.interpolate(vars),
            org: self.org.interpolate(vars),
            post_install: self.post_install.interpolate(vars),
        }
    }
}

impl Interpolate for CloneRepos {
    fn interpolate(&self, vars: &Vars) -> Self {
        Self {
            dest_unix: self.dest_unix.interpolate(vars),
            dest_windows: self.dest_windows.interpolate(vars),
            default_org: self.default_org.interpolate(vars),
            repos: self.repos.interpolate(vars),
        }
    }
}

impl Interpolate for StepAction {
    fn interpolate(&self, vars: &Vars) -> Self {
        match self {
            Self::WriteFile(wf) => Self::WriteFile(wf.interpolate(vars)),
            Self::CloneRepos(cr) => Self::CloneRepos(cr.interpolate(vars)),
            Self::Run(items) => Self::Run(items.interpolate(vars)),
            Self::NoOp => Self::NoOp,
        }
    }
}

impl Interpolate for Step {
    fn interpolate(&self, vars: &Vars) -> Self {
        Self {
            name: self.name.interpolate(vars),
            when: self.when.interpolate(vars),
            shell: self.shell,
            workdir: self.workdir.interpolate(vars),
            continue_on_error: self.continue_on_error,
            env: self.env.interpolate(vars),
            action: self.action.interpolate(vars),
        }
    }
}
