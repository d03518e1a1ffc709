//! `when:` guard evaluation.
//!
//! Grammar: `IDENT (==|!=) VALUE`, one comparison, no boolean composition.
//! VALUE may carry one layer of matching single or double quotes.
//! Anything that does not parse evaluates to false.

use super::types::Vars;
use regex::Regex;
use std::sync::LazyLock;

static GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=)\s*(.+?)\s*$").expect("static pattern")
});

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
}

/// A parsed guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub key: String,
    pub op: Comparison,
    pub value: String,
}

impl Guard {
    /// Parse a guard expression. Returns `None` when it is not a single comparison.
    pub fn parse(expr: &str) -> Option<Guard> {
        if expr.contains("&&") || expr.contains("||") {
            return None;
        }
        let caps = GUARD.captures(expr)?;
        let op = match &caps[2] {
            "==" => Comparison::Eq,
            _ => Comparison::Ne,
        };
        Some(Guard {
            key: caps[1].to_string(),
            op,
            value: unquote(caps[3].trim()).to_string(),
        })
    }

    /// Compare against `vars`; a missing key compares as the empty string.
    pub fn matches(&self, vars: &Vars) -> bool {
        let actual = vars.get(&self.key).map(String::as_str).unwrap_or("");
        match self.op {
            Comparison::Eq => actual == self.value,
            Comparison::Ne => actual != self.value,
        }
    }
}

fn unquote(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    raw
}

/// Evaluate a guard; unparseable guards fail closed.
pub fn evaluate(expr: &str, vars: &Vars) -> bool {
    match Guard::parse(expr) {
        Some(guard) => guard.matches(vars),
        None => {
            tracing::debug!(guard = expr, "unparseable guard evaluates to false");
            false
        }
    }
}
