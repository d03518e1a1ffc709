//! CLI subcommands: run, validate, plan.

use crate::core::context::{parse_overrides, RunContext, RunnerConfig};
use crate::core::executor::{self, RunOptions};
use crate::core::{parser, planner};
use crate::error::{ForgeError, Result};
use crate::transport::git::GitCli;
use crate::transport::local::LocalExecutor;
use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the spec's steps for this OS
    Run {
        /// Path to spec.yaml (default: per-user config location)
        spec: Option<PathBuf>,

        /// Print what would be done without touching anything
        #[arg(long)]
        dry_run: bool,

        /// Override an input (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Parse and validate a spec without running anything
    Validate {
        /// Path to spec.yaml (default: per-user config location)
        spec: Option<PathBuf>,
    },

    /// Show which steps would run on this OS
    Plan {
        /// Path to spec.yaml (default: per-user config location)
        spec: Option<PathBuf>,

        /// Override an input (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Dispatch a CLI command against the real host.
pub fn dispatch(cmd: Commands) -> Result<()> {
    let config = RunnerConfig::from_process();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dispatch_with(cmd, &config, &mut out)
}

/// Dispatch with an explicit host configuration and output sink.
pub fn dispatch_with(cmd: Commands, config: &RunnerConfig, out: &mut dyn Write) -> Result<()> {
    match cmd {
        Commands::Run { spec, dry_run, set } => {
            let path = spec_path(spec, config);
            cmd_run(&path, dry_run, &set, config, out)
        }
        Commands::Validate { spec } => cmd_validate(&spec_path(spec, config), out),
        Commands::Plan { spec, set, json } => {
            cmd_plan(&spec_path(spec, config), &set, json, config, out)
        }
    }
}

/// Explicit path, else the OS default location.
fn spec_path(explicit: Option<PathBuf>, config: &RunnerConfig) -> PathBuf {
    explicit.unwrap_or_else(|| config.default_spec_path(&config.resolve_os()))
}

fn cmd_run(
    path: &Path,
    dry_run: bool,
    set: &[String],
    config: &RunnerConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let opts = RunOptions {
        spec_path: path.to_path_buf(),
        dry_run,
        overrides: parse_overrides(set),
    };
    let executor = LocalExecutor;
    let cloner = GitCli::new(&executor);
    executor::run_spec(&opts, config, &executor, &cloner, out)?;
    Ok(())
}

fn cmd_validate(path: &Path, out: &mut dyn Write) -> Result<()> {
    let spec = parser::parse_spec_file(path)?;
    let errors = parser::validate_spec(&spec);

    if errors.is_empty() {
        writeln!(
            out,
            "OK: {} common steps, {} os sections",
            spec.common.steps.len(),
            spec.os.len()
        )?;
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(ForgeError::Config(format!(
            "{} validation error(s)",
            errors.len()
        )))
    }
}

fn cmd_plan(
    path: &Path,
    set: &[String],
    json: bool,
    config: &RunnerConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let spec = parser::load_spec(path)?;
    let ctx = RunContext::build(&spec, &parse_overrides(set), config);
    let plan = planner::plan(&spec, &ctx);

    if json {
        let rendered = serde_json::to_string_pretty(&plan)
            .map_err(|e| ForgeError::Config(format!("JSON serialization error: {}", e)))?;
        writeln!(out, "{}", rendered)?;
        return Ok(());
    }
    print_plan(&plan, out)
}

/// Display a plan.
fn print_plan(plan: &planner::Plan, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Planning: {} ({} steps)", plan.os, plan.steps.len())?;
    if let Some(ref root) = plan.workspace_root {
        let note = if plan.blocked { " (exists: run would abort)" } else { "" };
        writeln!(out, "Workspace root: {}{}", root.display(), note)?;
    }
    writeln!(out)?;

    for step in &plan.steps {
        let symbol = if step.will_run { "+" } else { " " };
        writeln!(
            out,
            "  {} [{}] {}: {}",
            symbol, step.index, step.name, step.description
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Plan: {} to run, {} skipped.",
        plan.will_run(),
        plan.steps.len() - plan.will_run()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(os: &str, home: &Path) -> RunnerConfig {
        RunnerConfig {
            home: Some(home.to_path_buf()),
            os_override: Some(os.to_string()),
            ..RunnerConfig::default()
        }
    }

    fn write_spec(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join("spec.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    fn render(cmd: Commands, config: &RunnerConfig) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = dispatch_with(cmd, config, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    const SPEC: &str = r#"
inputs:
  NAME: default
common:
  steps:
    - name: marker
      write_file:
        path: "~/out/{{NAME}}.txt"
        content: "hello {{NAME}}"
    - name: windows only
      when: "OS==windows"
      run: ["Write-Host hi"]
os:
  ubuntu:
    steps:
      - name: apt
        run: ["sudo apt-get update"]
  fedora:
    steps: []
"#;

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), SPEC);
        let (result, out) = render(Commands::Validate { spec: Some(path) }, &config("ubuntu", dir.path()));
        result.unwrap();
        assert_eq!(out.trim(), "OK: 2 common steps, 2 os sections");
    }

    #[test]
    fn test_validate_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), "common:\n  steps:\n    - run: []\n");
        let (result, _) = render(Commands::Validate { spec: Some(path) }, &config("ubuntu", dir.path()));
        assert!(result.unwrap_err().to_string().contains("1 validation error(s)"));
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (result, _) = render(
            Commands::Validate {
                spec: Some(dir.path().join("nope.yaml")),
            },
            &config("ubuntu", dir.path()),
        );
        assert!(matches!(result, Err(ForgeError::SpecNotFound(_))));
    }

    #[test]
    fn test_default_spec_path_used() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config("ubuntu", dir.path());
        let default = dir.path().join(".config").join("forgesetup").join("spec.yaml");
        std::fs::create_dir_all(default.parent().unwrap()).unwrap();
        std::fs::write(&default, "common:\n  steps: []\n").unwrap();
        let (result, out) = render(Commands::Validate { spec: None }, &cfg);
        result.unwrap();
        assert!(out.contains("OK: 0 common steps"));
    }

    #[test]
    fn test_run_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), SPEC);
        let (result, out) = render(
            Commands::Run {
                spec: Some(path),
                dry_run: true,
                set: vec![],
            },
            &config("ubuntu", dir.path()),
        );
        result.unwrap();
        assert!(out.contains("--- [marker] ---"));
        assert!(out.contains("DRY-RUN write_file ->"));
        assert!(out.contains("DRY-RUN run -> sudo apt-get update"));
        assert!(!out.contains("windows only"));
        assert!(out.ends_with("All steps complete.\n"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_run_writes_file_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), SPEC);
        let (result, _) = render(
            Commands::Run {
                spec: Some(path),
                dry_run: false,
                set: vec!["NAME=custom".to_string()],
            },
            &config("fedora", dir.path()),
        );
        result.unwrap();
        let written = std::fs::read_to_string(dir.path().join("out").join("custom.txt")).unwrap();
        assert_eq!(written, "hello custom");
    }

    #[test]
    fn test_run_guard_trips() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("ws")).unwrap();
        let path = write_spec(
            dir.path(),
            "inputs:\n  WORKSPACE_ROOT: \"~/ws\"\ncommon:\n  steps:\n    - name: x\n",
        );
        let (result, out) = render(
            Commands::Run {
                spec: Some(path),
                dry_run: true,
                set: vec![],
            },
            &config("arch", dir.path()),
        );
        assert!(matches!(result, Err(ForgeError::WorkspaceExists(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_plan_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), SPEC);
        let (result, out) = render(
            Commands::Plan {
                spec: Some(path),
                set: vec![],
                json: false,
            },
            &config("ubuntu", dir.path()),
        );
        result.unwrap();
        assert!(out.starts_with("Planning: ubuntu (3 steps)"));
        assert!(out.contains("  + [1] marker: write"));
        assert!(out.contains("    [2] windows only"));
        assert!(out.contains("Plan: 2 to run, 1 skipped."));
    }

    #[test]
    fn test_plan_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_spec(dir.path(), SPEC);
        let (result, out) = render(
            Commands::Plan {
                spec: Some(path),
                set: vec![],
                json: true,
            },
            &config("windows", dir.path()),
        );
        result.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["os"], "windows");
        assert_eq!(value["steps"].as_array().unwrap().len(), 2);
        assert_eq!(value["steps"][1]["action"], "run");
    }
}
