//! OS key detection and OS-derived defaults.

use super::types::ShellKind;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Application directory name used for default spec locations.
pub const APP_NAME: &str = "forgesetup";

/// Normalized OS/distribution identifier selecting `os.<key>` sections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OsKey(String);

impl OsKey {
    /// Keys are trimmed and lowercased so `os.<key>` lookups, guards and
    /// OS-dependent defaults all agree.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_windows(&self) -> bool {
        self.0 == "windows"
    }

    /// Shell used for string run-items when a step does not pick one.
    pub fn default_shell(&self) -> ShellKind {
        if self.is_windows() {
            ShellKind::Powershell
        } else {
            ShellKind::Posix
        }
    }

    /// Input variable naming the workspace root on this OS.
    pub fn workspace_root_var(&self) -> &'static str {
        if self.is_windows() {
            "WORKSPACE_ROOT_WIN"
        } else {
            "WORKSPACE_ROOT"
        }
    }
}

impl fmt::Display for OsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Detect the running OS.
pub fn detect_os() -> OsKey {
    if cfg!(windows) {
        return OsKey::new("windows");
    }
    if cfg!(target_os = "macos") {
        return OsKey::new("macos");
    }
    let release = std::fs::read_to_string("/etc/os-release").unwrap_or_default();
    os_from_release(&release)
}

/// Map `/etc/os-release` content to a distribution family key.
///
/// Unknown or unreadable releases fall back to `ubuntu`, the most common
/// package-manager family.
pub fn os_from_release(content: &str) -> OsKey {
    let field = |name: &str| -> String {
        content
            .lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix('='))
            .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_lowercase())
            .unwrap_or_default()
    };
    let id = field("ID");
    let like = field("ID_LIKE");

    let key = if matches!(id.as_str(), "ubuntu" | "debian" | "linuxmint" | "pop")
        || like.contains("debian")
    {
        "ubuntu"
    } else if matches!(
        id.as_str(),
        "fedora" | "rhel" | "centos" | "rocky" | "almalinux"
    ) || like.contains("rhel")
        || like.contains("fedora")
    {
        "fedora"
    } else if matches!(
        id.as_str(),
        "arch" | "manjaro" | "endeavouros" | "arcolinux"
    ) {
        "arch"
    } else {
        "ubuntu"
    };
    OsKey::new(key)
}

/// Default spec location, derived purely from the OS key.
///
/// Windows: `%APPDATA%\forgesetup\spec.yaml` (falling back to
/// `<home>\AppData\Roaming`). Elsewhere: `~/.config/forgesetup/spec.yaml`.
pub fn default_spec_path(os: &OsKey, home: Option<&Path>, appdata: Option<&str>) -> PathBuf {
    let home = home
        .map(|h| h.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    if os.is_windows() {
        let base = match appdata {
            Some(dir) if !dir.is_empty() => dir.trim_end_matches('\\').to_string(),
            _ => format!("{}\\AppData\\Roaming", home.trim_end_matches('\\')),
        };
        PathBuf::from(format!("{}\\{}\\spec.yaml", base, APP_NAME))
    } else {
        PathBuf::from(home)
            .join(".config")
            .join(APP_NAME)
            .join("spec.yaml")
    }
}
