//! `write_file` action handler.

use crate::core::executor::StepRun;
use crate::core::types::WriteFile;
use crate::error::{ForgeError, Result};
use std::io::Write;
use std::path::Path;

/// Perform a `write_file` step (or print it under dry-run).
pub fn apply(wf: &WriteFile, step: &StepRun, out: &mut dyn Write) -> Result<u32> {
    let path = step.ctx.expand_path(&wf.path);
    if step.dry_run {
        writeln!(out, "DRY-RUN write_file -> {}", path.display())?;
        return Ok(0);
    }
    write_file(&path, &wf.content, wf.mode.as_deref(), wf.append)?;
    Ok(0)
}

/// Write `content` to `path`, creating parent directories.
///
/// `append` only applies when the file already exists; otherwise the file is
/// created with exactly `content`. `mode` is applied best effort.
pub fn write_file(path: &Path, content: &str, mode: Option<&str>, append: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
    }

    if append && path.exists() {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| ForgeError::io(path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ForgeError::io(path, e))?;
    } else {
        std::fs::write(path, content).map_err(|e| ForgeError::io(path, e))?;
    }

    if let Some(mode) = mode.map(str::trim).filter(|m| !m.is_empty()) {
        set_mode(path, mode);
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: &str) {
    use std::os::unix::fs::PermissionsExt;
    let bits = match u32::from_str_radix(mode, 8) {
        Ok(bits) => bits,
        Err(e) => {
            tracing::debug!(mode, error = %e, "ignoring invalid file mode");
            return;
        }
    };
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(bits)) {
        tracing::debug!(path = %path.display(), error = %e, "chmod failed");
    }
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: &str) {
    tracing::debug!(path = %path.display(), mode, "file modes not supported on this platform");
}
