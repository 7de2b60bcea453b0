//! Per-run filesystem workspaces.
//!
//! Every pipeline run owns one uniquely-named scratch directory under the
//! system temp root. The directory is recursively removed exactly once when
//! the workspace is dropped, on every exit path. Removal failure is logged
//! and never escalated: cleanup problems must not mask the run's own result.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::DeployError;

/// An exclusively-owned scratch directory for one pipeline run.
///
/// Never shared across runs; concurrent runs each create their own.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    retained: bool,
}

impl Workspace {
    /// Create a fresh, collision-free workspace under the system temp root.
    pub fn create() -> Result<Self, DeployError> {
        Self::create_in(std::env::temp_dir())
    }

    /// Create a workspace under a specific parent directory.
    pub fn create_in(parent: impl AsRef<Path>) -> Result<Self, DeployError> {
        let dir = tempfile::Builder::new()
            .prefix("permalift-")
            .tempdir_in(parent.as_ref())
            .map_err(|source| DeployError::Workspace { source })?;

        // Ownership of cleanup moves to our Drop impl so failures get logged.
        let root = dir.into_path();
        debug!(path = %root.display(), "workspace created");

        Ok(Self {
            root,
            retained: false,
        })
    }

    /// Root directory of this workspace.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Allocate (and create) a subdirectory for a pipeline stage.
    pub fn subdir(&self, name: &str) -> Result<PathBuf, DeployError> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).map_err(|source| DeployError::Workspace { source })?;
        Ok(dir)
    }

    /// Keep the directory on disk after the run, for debugging.
    pub fn retain(&mut self) {
        self.retained = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.retained {
            warn!(path = %self.root.display(), "workspace retained for debugging");
            return;
        }

        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(path = %self.root.display(), "workspace removed"),
            Err(e) => warn!(
                path = %self.root.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_removed_on_drop() {
        let ws = Workspace::create().unwrap();
        let root = ws.path().to_path_buf();
        assert!(root.exists());

        drop(ws);
        assert!(!root.exists());
    }

    #[test]
    fn test_workspace_removed_when_populated() {
        let ws = Workspace::create().unwrap();
        let root = ws.path().to_path_buf();

        let sub = ws.subdir("source").unwrap();
        std::fs::write(sub.join("index.html"), "<html></html>").unwrap();

        drop(ws);
        assert!(!root.exists());
    }

    #[test]
    fn test_retained_workspace_survives_drop() {
        let mut ws = Workspace::create().unwrap();
        let root = ws.path().to_path_buf();
        ws.retain();

        drop(ws);
        assert!(root.exists());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_workspaces_are_collision_free() {
        let a = Workspace::create().unwrap();
        let b = Workspace::create().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
