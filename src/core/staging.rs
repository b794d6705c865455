// ─── Staging ───
// Output for a version is assembled in a sibling directory and swapped into
// place only once the whole pipeline for that version succeeded.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::{SyncError, SyncResult};

/// A scratch directory that is removed on drop unless promoted.
pub struct StagingDir {
    path: PathBuf,
    target: PathBuf,
    promoted: bool,
}

impl StagingDir {
    /// Create `.<name>.staging-<uuid>` next to `target`.
    pub fn for_target(target: &Path) -> SyncResult<Self> {
        let parent = target
            .parent()
            .ok_or_else(|| SyncError::Configuration(format!("{target:?} has no parent")))?;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = parent.join(format!(".{name}.staging-{}", Uuid::new_v4().simple()));
        create_dir_all(&path)?;
        Ok(Self {
            path,
            target: target.to_path_buf(),
            promoted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the target with the staged tree.
    pub fn promote(mut self) -> SyncResult<PathBuf> {
        if self.target.exists() {
            std::fs::remove_dir_all(&self.target).map_err(|e| SyncError::io(&self.target, e))?;
        }
        std::fs::rename(&self.path, &self.target).map_err(|e| SyncError::io(&self.target, e))?;
        self.promoted = true;
        debug!("Promoted {:?}", self.target);
        Ok(self.target.clone())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.promoted || !self.path.exists() {
            return;
        }
        if let Err(source) = std::fs::remove_dir_all(&self.path) {
            warn!("Failed to remove staging dir {:?}: {}", self.path, source);
        }
    }
}

pub fn create_dir_all(path: &Path) -> SyncResult<()> {
    std::fs::create_dir_all(path).map_err(|e| SyncError::io(path, e))
}

/// Write `bytes` to `path`, creating parent directories.
pub fn write_file(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, bytes).map_err(|e| SyncError::io(path, e))
}

/// Upper bound on buffer preallocation for archive entries.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Preallocation for an archive entry whose header claims `declared` bytes.
/// Header sizes are not trusted.
pub fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

pub fn read_file(path: &Path) -> SyncResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| SyncError::io(path, e))
}

/// Names of the immediate subdirectories of `dir`, sorted.
pub fn subdirectories(dir: &Path) -> SyncResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type().map_err(|e| SyncError::io(entry.path(), e))?.is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_staging_leaves_no_trace() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("1.20.1");
        {
            let staging = StagingDir::for_target(&target).unwrap();
            write_file(&staging.path().join("vanilla/en_US.lang"), b"a=b").unwrap();
        }
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn promote_replaces_previous_tree() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("1.20.1");
        write_file(&target.join("stale.lang"), b"old=1").unwrap();

        let staging = StagingDir::for_target(&target).unwrap();
        write_file(&staging.path().join("fresh.lang"), b"new=1").unwrap();
        staging.promote().unwrap();

        assert!(!target.join("stale.lang").exists());
        assert_eq!(std::fs::read(target.join("fresh.lang")).unwrap(), b"new=1");
    }

    #[test]
    fn declared_entry_sizes_are_capped() {
        assert_eq!(capacity_hint(42), 42);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOC as usize);
    }

    #[test]
    fn hidden_directories_are_not_listed() {
        let root = tempfile::tempdir().unwrap();
        create_dir_all(&root.path().join("1.20.0")).unwrap();
        create_dir_all(&root.path().join(".1.20.1.staging-x")).unwrap();
        write_file(&root.path().join("file.txt"), b"").unwrap();
        assert_eq!(subdirectories(root.path()).unwrap(), vec!["1.20.0"]);
    }
}
