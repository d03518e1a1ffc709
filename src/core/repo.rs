//! Repository URL resolution for `clone_repos` entries.

use super::types::RepoEntry;
use crate::error::{ForgeError, Result};

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Compute the clone URL for an entry.
///
/// Precedence: explicit `url`; then `org` (or `default_org`) + `name` as a
/// GitHub URL; then an `org/name` shorthand in `name`.
pub fn resolve_url(entry: &RepoEntry, default_org: Option<&str>) -> Result<String> {
    if let Some(url) = non_empty(entry.url.as_deref()) {
        return Ok(url.to_string());
    }
    let name = non_empty(entry.name.as_deref()).ok_or_else(|| {
        ForgeError::Config("repo entry must contain 'url' or 'name'".to_string())
    })?;

    if let Some(org) = non_empty(entry.org.as_deref()).or(non_empty(default_org)) {
        return Ok(format!("https://github.com/{}/{}.git", org, name));
    }
    if name.contains('/') {
        return Ok(format!("https://github.com/{}.git", name));
    }
    Err(ForgeError::Config(format!(
        "cannot resolve repo '{}': no org provided and default_org not set",
        name
    )))
}

/// Local directory name for an entry: its `name`, else the URL's last path
/// segment without a trailing `.git`.
pub fn target_dir_name(entry: &RepoEntry, url: &str) -> String {
    if let Some(name) = non_empty(entry.name.as_deref()) {
        return name.to_string();
    }
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
