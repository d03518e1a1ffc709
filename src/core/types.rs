//! Spec document types.
//!
//! Steps are decoded into a typed action model at load time: a step carries
//! exactly one of `write_file`, `clone_repos` or `run` (or none, a no-op), and
//! every run-item is either a shell string or an argv vector. Malformed shapes
//! are rejected while parsing, never deep inside dispatch.

use super::platform::OsKey;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Flat string-keyed variable bag used for interpolation and guards.
pub type Vars = HashMap<String, String>;

// ============================================================================
// Top-level spec
// ============================================================================

/// Root document: inputs, environment, common steps, per-OS sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spec {
    /// Variables available for interpolation (overridable with `--set`)
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: IndexMap<String, serde_yaml_ng::Value>,

    /// Global environment templates
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: IndexMap<String, serde_yaml_ng::Value>,

    /// Steps applied on every OS, first
    #[serde(default, deserialize_with = "null_as_default")]
    pub common: StepList,

    /// Per-OS steps and environment, keyed by OS key
    #[serde(default, deserialize_with = "null_as_default")]
    pub os: IndexMap<String, OsSection>,
}

impl Spec {
    /// Steps in execution order for `os`: common steps, then the OS's own.
    pub fn steps_for<'a>(&'a self, os: &OsKey) -> impl Iterator<Item = &'a Step> + 'a {
        let os_steps = self
            .os_section(os)
            .map(|section| section.steps.as_slice())
            .unwrap_or_default();
        self.common.steps.iter().chain(os_steps.iter())
    }

    /// Environment templates declared for `os`, if any.
    pub fn os_env(&self, os: &OsKey) -> Option<&IndexMap<String, serde_yaml_ng::Value>> {
        self.os_section(os).map(|section| &section.env)
    }

    /// Section keyed by `os`, matching keys the way [`OsKey::new`] normalizes them.
    pub fn os_section(&self, os: &OsKey) -> Option<&OsSection> {
        self.os.get(os.as_str()).or_else(|| {
            self.os
                .iter()
                .find(|(key, _)| OsKey::new(key.as_str()) == *os)
                .map(|(_, section)| section)
        })
    }
}

/// Ordered list of steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
}

/// OS-specific section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsSection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub env: IndexMap<String, serde_yaml_ng::Value>,
}

// ============================================================================
// Steps
// ============================================================================

/// One action unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct Step {
    /// Display name (defaults to `step-{index}`)
    pub name: Option<String>,

    /// Guard expression (`KEY==value` / `KEY!=value`)
    pub when: Option<String>,

    /// Shell override for string run-items
    pub shell: Option<ShellKind>,

    /// Working directory for `run` items
    pub workdir: Option<String>,

    /// Recover from process failures instead of aborting the run
    pub continue_on_error: bool,

    /// Step-local environment overrides
    pub env: IndexMap<String, serde_yaml_ng::Value>,

    /// The action this step performs
    pub action: StepAction,
}

impl Step {
    /// Explicit name, or a positional label (1-based).
    pub fn display_name(&self, index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("step-{}", index),
        }
    }
}

/// Step action; exactly one per step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    WriteFile(WriteFile),
    CloneRepos(CloneRepos),
    Run(Vec<RunItem>),
    NoOp,
}

impl StepAction {
    /// Short action name for plans and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WriteFile(_) => "write_file",
            Self::CloneRepos(_) => "clone_repos",
            Self::Run(_) => "run",
            Self::NoOp => "no-op",
        }
    }
}

/// Wire shape of a step before action selection.
#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    when: Option<String>,
    #[serde(default)]
    shell: Option<ShellKind>,
    #[serde(default)]
    workdir: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    continue_on_error: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    env: IndexMap<String, serde_yaml_ng::Value>,
    #[serde(default)]
    write_file: Option<WriteFile>,
    #[serde(default)]
    clone_repos: Option<CloneRepos>,
    #[serde(default)]
    run: Option<Vec<RunItem>>,
}

impl TryFrom<RawStep> for Step {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let mut actions = Vec::new();
        if let Some(wf) = raw.write_file {
            actions.push(StepAction::WriteFile(wf));
        }
        if let Some(cr) = raw.clone_repos {
            actions.push(StepAction::CloneRepos(cr));
        }
        if let Some(items) = raw.run {
            actions.push(StepAction::Run(items));
        }
        if actions.len() > 1 {
            let kinds: Vec<_> = actions.iter().map(StepAction::kind).collect();
            return Err(format!(
                "step {}declares more than one action ({}); use exactly one of write_file, clone_repos, run",
                raw.name.map(|n| format!("'{}' ", n)).unwrap_or_default(),
                kinds.join(", ")
            ));
        }

        Ok(Step {
            name: raw.name,
            when: raw.when,
            shell: raw.shell,
            workdir: raw.workdir,
            continue_on_error: raw.continue_on_error,
            env: raw.env,
            action: actions.pop().unwrap_or(StepAction::NoOp),
        })
    }
}

/// Shell used for string run-items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    /// Login bash: `bash -lc <cmd>`
    #[serde(alias = "bash", alias = "sh")]
    Posix,
    /// `powershell -NoProfile -ExecutionPolicy Bypass -Command <cmd>`
    #[serde(alias = "pwsh")]
    Powershell,
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posix => write!(f, "bash"),
            Self::Powershell => write!(f, "powershell"),
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// `write_file` action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WriteFile {
    /// Target path (`~` expanded)
    pub path: String,

    /// File content (default empty)
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    /// Octal permission string, e.g. "0600" (best effort)
    #[serde(default, deserialize_with = "optional_scalar")]
    pub mode: Option<String>,

    /// Append when the target already exists
    #[serde(default, deserialize_with = "null_as_default")]
    pub append: bool,
}

/// `clone_repos` action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CloneRepos {
    /// Destination root on non-Windows hosts
    #[serde(default)]
    pub dest_unix: Option<String>,

    /// Destination root on Windows hosts
    #[serde(default)]
    pub dest_windows: Option<String>,

    /// Org used for entries without their own `org` or `url`
    #[serde(default)]
    pub default_org: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub repos: Vec<RepoEntry>,
}

/// One repository to clone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepoEntry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub org: Option<String>,

    /// Commands run inside the clone after it is created
    #[serde(default, deserialize_with = "null_as_default")]
    pub post_install: Vec<RunItem>,
}

/// A single executable unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_yaml_ng::Value")]
pub enum RunItem {
    /// Executed under the step's shell
    Shell(String),
    /// Executed directly, never through a shell
    Argv(Vec<String>),
}

impl TryFrom<serde_yaml_ng::Value> for RunItem {
    type Error = String;

    fn try_from(value: serde_yaml_ng::Value) -> Result<Self, Self::Error> {
        use serde_yaml_ng::Value;
        match value {
            Value::String(cmd) => Ok(RunItem::Shell(cmd)),
            Value::Mapping(map) => {
                let argv = map
                    .get("argv")
                    .ok_or("unsupported run item; use a string or {argv: [...]}")?;
                let Value::Sequence(parts) = argv else {
                    return Err("argv must be a list".to_string());
                };
                let argv = parts
                    .iter()
                    .map(|part| match part {
                        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                            Ok(yaml_value_to_string(part))
                        }
                        other => Err(format!("argv elements must be scalars, got {:?}", other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RunItem::Argv(argv))
            }
            other => Err(format!(
                "unsupported run item {:?}; use a string or {{argv: [...]}}",
                other
            )),
        }
    }
}

impl fmt::Display for RunItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(cmd) => write!(f, "{}", cmd),
            Self::Argv(argv) => write!(f, "argv {:?}", argv),
        }
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Treat an explicit YAML `null` (e.g. `inputs:` with no body) as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a string or a bare scalar (`mode: 0600` arrives as a number).
fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml_ng::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml_ng::Value::Null) => None,
        Some(v) => Some(yaml_value_to_string(&v)),
    })
}

/// Convert a YAML value to the string seen by interpolation and child processes.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(yaml: &str) -> Result<Step, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(yaml)
    }

    #[test]
    fn test_step_write_file_action() {
        let s = step("name: dotfile\nwrite_file:\n  path: ~/.npmrc\n  content: x\n  mode: \"0600\"\n")
            .unwrap();
        match s.action {
            StepAction::WriteFile(wf) => {
                assert_eq!(wf.path, "~/.npmrc");
                assert_eq!(wf.mode.as_deref(), Some("0600"));
                assert!(!wf.append);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_step_without_action_is_noop() {
        let s = step("name: nothing\n").unwrap();
        assert_eq!(s.action, StepAction::NoOp);
        assert!(!s.continue_on_error);
    }

    #[test]
    fn test_step_multiple_actions_rejected() {
        let err = step("write_file: {path: /tmp/x}\nrun: [\"echo hi\"]\n").unwrap_err();
        assert!(err.to_string().contains("more than one action"));
    }

    #[test]
    fn test_run_item_shapes() {
        let s = step("run:\n  - echo hi\n  - argv: [echo, hi, 3]\n").unwrap();
        let StepAction::Run(items) = s.action else {
            panic!("expected run action");
        };
        assert_eq!(items[0], RunItem::Shell("echo hi".into()));
        assert_eq!(
            items[1],
            RunItem::Argv(vec!["echo".into(), "hi".into(), "3".into()])
        );
    }

    #[test]
    fn test_run_item_argv_not_list() {
        let err = step("run:\n  - argv: \"echo hi\"\n").unwrap_err();
        assert!(err.to_string().contains("argv must be a list"));
    }

    #[test]
    fn test_run_item_unknown_shape() {
        let err = step("run:\n  - cmd: echo\n").unwrap_err();
        assert!(err.to_string().contains("unsupported run item"));
        let err = step("run:\n  - 42\n").unwrap_err();
        assert!(err.to_string().contains("unsupported run item"));
    }

    #[test]
    fn test_shell_aliases() {
        let s = step("shell: bash\n").unwrap();
        assert_eq!(s.shell, Some(ShellKind::Posix));
        let s = step("shell: pwsh\n").unwrap();
        assert_eq!(s.shell, Some(ShellKind::Powershell));
        let s = step("shell: powershell\n").unwrap();
        assert_eq!(s.shell, Some(ShellKind::Powershell));
        assert!(step("shell: fish\n").is_err());
    }

    #[test]
    fn test_mode_accepts_number() {
        let s = step("write_file:\n  path: /tmp/x\n  mode: 600\n").unwrap();
        let StepAction::WriteFile(wf) = s.action else {
            panic!("expected write_file");
        };
        assert_eq!(wf.mode.as_deref(), Some("600"));
    }

    #[test]
    fn test_display_name_defaults_to_position() {
        let s = step("run: [\"true\"]\n").unwrap();
        assert_eq!(s.display_name(3), "step-3");
        let s = step("name: \"  \"\nrun: [\"true\"]\n").unwrap();
        assert_eq!(s.display_name(1), "step-1");
    }

    #[test]
    fn test_null_sections_are_empty() {
        let spec: Spec = serde_yaml_ng::from_str("inputs:\nenv:\ncommon:\n  steps:\n").unwrap();
        assert!(spec.inputs.is_empty());
        assert!(spec.env.is_empty());
        assert!(spec.common.steps.is_empty());
    }

    #[test]
    fn test_steps_for_orders_common_first() {
        let spec: Spec = serde_yaml_ng::from_str(
            r#"
common:
  steps:
    - name: A
    - name: B
os:
  X:
    steps:
      - name: C
      - name: D
  Y:
    steps:
      - name: E
"#,
        )
        .unwrap();
        let names: Vec<_> = spec
            .steps_for(&OsKey::new("X"))
            .map(|s| s.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);

        let names: Vec<_> = spec
            .steps_for(&OsKey::new("unknown"))
            .map(|s| s.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_os_section_matches_case_insensitively() {
        let spec: Spec = serde_yaml_ng::from_str(
            "os:\n  Windows:\n    env: {A: x}\n    steps:\n      - name: W\n",
        )
        .unwrap();
        let os = OsKey::new("WINDOWS");
        assert_eq!(spec.steps_for(&os).count(), 1);
        assert!(spec.os_env(&os).is_some_and(|env| env.contains_key("A")));
    }

    #[test]
    fn test_yaml_value_to_string() {
        use serde_yaml_ng::Value;
        assert_eq!(yaml_value_to_string(&Value::String("a".into())), "a");
        assert_eq!(yaml_value_to_string(&Value::Bool(true)), "true");
        assert_eq!(yaml_value_to_string(&Value::Null), "");
        let n: Value = serde_yaml_ng::from_str("42").unwrap();
        assert_eq!(yaml_value_to_string(&n), "42");
    }
}
