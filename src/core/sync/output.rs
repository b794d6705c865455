// ─── CI Output ───
// Under GitHub Actions each single-version command appends the version it
// produced (or `/` when nothing changed) to the file named by the edition's
// output variable, for later workflow steps to read.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use super::Edition;
use crate::core::error::{SyncError, SyncResult};

pub fn running_in_github_actions() -> bool {
    std::env::var_os("GITHUB_ACTIONS").is_some_and(|v| !v.is_empty())
}

/// Append the outcome for `edition` when running under GitHub Actions.
pub fn report_version(edition: Edition, changed: Option<&str>) -> SyncResult<()> {
    if !running_in_github_actions() {
        return Ok(());
    }
    let Some(path) = std::env::var_os(edition.output_env()) else {
        debug!("{} is not set; skipping CI output", edition.output_env());
        return Ok(());
    };
    append_line(Path::new(&path), changed.unwrap_or("/"))
}

pub fn append_line(path: &Path, line: &str) -> SyncResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SyncError::io(path, e))?;
    writeln!(file, "{line}").map_err(|e| SyncError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edition.txt");
        append_line(&path, "1.21.0.3").unwrap();
        append_line(&path, "/").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.21.0.3\n/\n");
    }
}
