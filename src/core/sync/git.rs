use std::path::PathBuf;
use std::process::{Command, Output};

use tracing::{debug, info};

use crate::core::error::{SyncError, SyncResult};

/// Records finished versions in source control.
pub trait Committer: Send + Sync {
    /// Stage everything and commit. Returns `false` when there was nothing
    /// to commit.
    fn commit(&self, message: &str) -> SyncResult<bool>;
    fn push(&self) -> SyncResult<()>;
}

/// Shells out to `git` in the repository root.
pub struct GitCommitter {
    repo_dir: PathBuf,
}

impl GitCommitter {
    pub fn new(repo_dir: PathBuf) -> Self {
        Self { repo_dir }
    }

    fn git(&self, args: &[&str]) -> SyncResult<Output> {
        debug!("git {}", args.join(" "));
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| SyncError::Git {
                command: args.join(" "),
                message: e.to_string(),
            })
    }

    fn git_checked(&self, args: &[&str]) -> SyncResult<Output> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(SyncError::Git {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Committer for GitCommitter {
    fn commit(&self, message: &str) -> SyncResult<bool> {
        self.git_checked(&["add", "-A", "."])?;
        // `diff --cached --quiet` exits 1 when something is staged.
        let staged = self.git(&["diff", "--cached", "--quiet"])?;
        match staged.status.code() {
            Some(0) => {
                info!("Nothing to commit for \"{}\"", message);
                return Ok(false);
            }
            Some(1) => {}
            _ => {
                return Err(SyncError::Git {
                    command: "diff --cached --quiet".into(),
                    message: String::from_utf8_lossy(&staged.stderr).trim().to_string(),
                })
            }
        }
        self.git_checked(&["commit", "-m", message])?;
        info!("Committed \"{}\"", message);
        Ok(true)
    }

    fn push(&self) -> SyncResult<()> {
        info!("Pushing commits");
        self.git_checked(&["push"])?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Keeps commit messages in memory.
    #[derive(Default)]
    pub(crate) struct RecordingCommitter {
        pub messages: Mutex<Vec<String>>,
        pub pushes: Mutex<u32>,
    }

    impl Committer for RecordingCommitter {
        fn commit(&self, message: &str) -> SyncResult<bool> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(true)
        }

        fn push(&self) -> SyncResult<()> {
            *self.pushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn git_failures_are_source_control_errors() {
        let dir = tempfile::tempdir().unwrap();
        let committer = GitCommitter::new(dir.path().join("does-not-exist"));
        let err = committer.commit("Update").unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::SourceControl);
    }
}
