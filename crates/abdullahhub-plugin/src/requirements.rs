//! Requirement checks for command plugins.
//!
//! A requirement is an executable that must be resolvable on `PATH`, or an
//! absolute path to one. Nothing is ever installed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Requirements from `requirements` that cannot be resolved.
pub fn missing(requirements: &[String]) -> Vec<String> {
    missing_in(requirements, std::env::var_os("PATH"))
}

/// [`missing`] against an explicit `PATH` value.
pub fn missing_in(requirements: &[String], path_var: Option<OsString>) -> Vec<String> {
    let dirs: Vec<PathBuf> = path_var
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();

    requirements
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .filter(|r| resolve(r, &dirs).is_none())
        .map(str::to_string)
        .collect()
}

/// Locate an executable by absolute path or by searching `dirs`.
pub fn resolve(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    if candidate.components().count() != 1 {
        return None;
    }
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
