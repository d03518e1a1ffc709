//! Benchmarks for forgesetup core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forgesetup::core::types::Vars;
use forgesetup::core::{condition, parser, resolver};

fn bench_vars(n: usize) -> Vars {
    (0..n)
        .map(|i| (format!("VAR_{i}"), format!("value-{i}")))
        .collect()
}

fn bench_interpolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolate");
    for refs in [1, 8, 64] {
        let vars = bench_vars(refs);
        let template: String = (0..refs)
            .map(|i| {
                if i % 2 == 0 {
                    format!("{{{{VAR_{i}}}}}/")
                } else {
                    format!("${{VAR_{i}}}/")
                }
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(refs), &template, |b, t| {
            b.iter(|| black_box(resolver::interpolate_str(black_box(t), &vars)));
        });
    }
    group.finish();
}

fn bench_interpolate_nested(c: &mut Criterion) {
    let mut vars = bench_vars(4);
    vars.insert("ROOT".into(), "{{VAR_0}}/{{VAR_1}}".into());
    vars.insert("LEAF".into(), "{{ROOT}}/${VAR_2}".into());
    c.bench_function("interpolate_nested", |b| {
        b.iter(|| black_box(resolver::interpolate_str(black_box("~/{{LEAF}}/x"), &vars)));
    });
}

fn bench_guard(c: &mut Criterion) {
    let mut vars = bench_vars(16);
    vars.insert("OS".into(), "ubuntu".into());
    let mut group = c.benchmark_group("guard");
    for expr in ["OS==ubuntu", "OS != 'windows'", "OS = broken", "MISSING==x"] {
        group.bench_with_input(BenchmarkId::from_parameter(expr), expr, |b, e| {
            b.iter(|| black_box(condition::evaluate(black_box(e), &vars)));
        });
    }
    group.finish();
}

fn bench_spec_parse(c: &mut Criterion) {
    let yaml = r#"
inputs:
  SESSION_NAME: dev
  DEFAULT_ORG: acme
  WORKSPACE_ROOT: "~/dev/workspace"
env:
  EDITOR: vim
  GOPATH: "{{WORKSPACE_ROOT}}/go"
common:
  steps:
    - name: npmrc
      write_file:
        path: "~/.npmrc"
        content: "//registry.npmjs.org/:_authToken=${NPM_TOKEN}"
        mode: "0600"
    - name: repos
      clone_repos:
        dest_unix: "{{WORKSPACE_ROOT}}"
        dest_windows: "~/dev"
        repos:
          - name: service-a
          - name: service-b
            org: other
          - url: https://github.com/someone/explicit.git
            post_install:
              - argv: [make, setup]
              - "echo done"
os:
  ubuntu:
    env:
      DEBIAN_FRONTEND: noninteractive
    steps:
      - name: apt
        when: "OS==ubuntu"
        run:
          - "sudo apt-get update"
          - argv: [sudo, apt-get, install, -y, git, curl]
  windows:
    steps:
      - name: winget
        shell: powershell
        run: ["winget install Git.Git"]
"#;

    c.bench_function("spec_parse", |b| {
        b.iter(|| {
            let spec = parser::parse_spec(black_box(yaml)).unwrap();
            black_box(spec);
        });
    });

    c.bench_function("spec_parse_validate", |b| {
        b.iter(|| {
            let spec = parser::parse_spec(black_box(yaml)).unwrap();
            black_box(parser::validate_spec(&spec));
        });
    });
}

criterion_group!(
    benches,
    bench_interpolate,
    bench_interpolate_nested,
    bench_guard,
    bench_spec_parse
);
criterion_main!(benches);
