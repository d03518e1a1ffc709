//! Run configuration, variable context and environment layering.
//!
//! `RunnerConfig` is the only place the real process environment is read;
//! everything downstream receives it explicitly.

use super::platform::{self, OsKey};
use super::resolver::interpolate_str;
use super::types::*;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Overrides the home directory used for `~` expansion and child processes.
pub const HOME_OVERRIDE_VAR: &str = "FORGE_HOME";
/// Bypasses live OS detection.
pub const OS_OVERRIDE_VAR: &str = "FORGE_OS";

/// Host facts a run depends on.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Home directory for `~` expansion
    pub home: Option<PathBuf>,
    /// Explicit OS key (skips detection)
    pub os_override: Option<String>,
    /// Windows roaming app-data directory
    pub appdata: Option<String>,
    /// Environment inherited by spawned processes
    pub process_env: IndexMap<String, String>,
}

impl RunnerConfig {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self::from_env(std::env::vars().collect())
    }

    /// Build from an environment map. A home override is mirrored into the
    /// child environment's `HOME` and `USERPROFILE`.
    pub fn from_env(mut env: IndexMap<String, String>) -> Self {
        let lookup = |env: &IndexMap<String, String>, key: &str| {
            env.get(key).filter(|v| !v.trim().is_empty()).cloned()
        };

        let home_override = lookup(&env, HOME_OVERRIDE_VAR);
        if let Some(ref home) = home_override {
            env.insert("HOME".to_string(), home.clone());
            env.insert("USERPROFILE".to_string(), home.clone());
        }
        let home = home_override
            .or_else(|| lookup(&env, "HOME"))
            .or_else(|| lookup(&env, "USERPROFILE"))
            .map(PathBuf::from);

        Self {
            home,
            os_override: lookup(&env, OS_OVERRIDE_VAR),
            appdata: lookup(&env, "APPDATA"),
            process_env: env,
        }
    }

    /// Explicit override first, live detection otherwise.
    pub fn resolve_os(&self) -> OsKey {
        match self.os_override {
            Some(ref key) => OsKey::new(key),
            None => platform::detect_os(),
        }
    }

    /// Default spec location for `os`.
    pub fn default_spec_path(&self, os: &OsKey) -> PathBuf {
        platform::default_spec_path(os, self.home.as_deref(), self.appdata.as_deref())
    }
}

/// Parse `KEY=VALUE` overrides. Items without `=` are ignored.
pub fn parse_overrides(items: &[String]) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for item in items {
        match item.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                out.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => tracing::warn!(item = item.as_str(), "ignoring override without KEY=VALUE form"),
        }
    }
    out
}

/// Immutable per-run context: OS, variables, merged environment.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub os: OsKey,
    /// inputs, then overrides, then `OS`
    pub vars: Vars,
    /// process env, then spec env, then OS env
    pub env: Vars,
    pub home: Option<PathBuf>,
}

impl RunContext {
    pub fn build(
        spec: &Spec,
        overrides: &IndexMap<String, String>,
        config: &RunnerConfig,
    ) -> Self {
        let os = config.resolve_os();
        let vars = build_vars(spec, overrides, &os);
        let env = build_environment(spec, &vars, &os, &config.process_env);
        Self {
            os,
            vars,
            env,
            home: config.home.clone(),
        }
    }

    /// Variables visible to step interpolation and guards. Context variables
    /// shadow environment entries of the same name, so `OS` is always the
    /// resolved key.
    pub fn step_vars(&self) -> Vars {
        let mut merged = self.env.clone();
        merged.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Expand a leading `~` against the configured home.
    pub fn expand_path(&self, raw: &str) -> PathBuf {
        expand_home(raw, self.home.as_deref())
    }

    /// Expanded workspace root for this OS, when the input is set.
    pub fn workspace_root(&self) -> Option<PathBuf> {
        let raw = self.vars.get(self.os.workspace_root_var())?;
        let resolved = interpolate_str(raw, &self.step_vars());
        if resolved.trim().is_empty() {
            return None;
        }
        Some(self.expand_path(resolved.trim()))
    }
}

/// Expand a leading `~` against `home`; other paths pass through.
pub fn expand_home(raw: &str, home: Option<&Path>) -> PathBuf {
    PathBuf::from(shellexpand::tilde_with_context(raw, || home.and_then(Path::to_str)).into_owned())
}

/// `inputs` overridden by `--set`, with `OS` injected last.
pub fn build_vars(spec: &Spec, overrides: &IndexMap<String, String>, os: &OsKey) -> Vars {
    let mut vars: Vars = spec
        .inputs
        .iter()
        .map(|(k, v)| (k.clone(), yaml_value_to_string(v)))
        .collect();
    vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    vars.insert("OS".to_string(), os.as_str().to_string());
    vars
}

/// Layer process env, spec env and OS env. Each spec value is interpolated
/// against the context plus everything merged before it.
pub fn build_environment(
    spec: &Spec,
    vars: &Vars,
    os: &OsKey,
    process_env: &IndexMap<String, String>,
) -> Vars {
    let mut merged: Vars = process_env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let layers = std::iter::once(&spec.env).chain(spec.os_env(os));
    for layer in layers {
        for (key, template) in layer {
            let mut scope = merged.clone();
            scope.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            let value = interpolate_str(&yaml_value_to_string(template), &scope);
            merged.insert(key.clone(), value);
        }
    }
    merged
}
