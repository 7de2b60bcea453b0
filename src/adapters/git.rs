//! Repository acquisition via the system git binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use super::{run_command, CommandOutput};
use crate::core::error::DeployError;

/// Fetches remote repositories into a workspace subdirectory.
///
/// Transient network failures are surfaced to the caller unchanged; retry
/// policy belongs to whoever invoked the pipeline.
pub struct GitFetcher {
    /// Path to the git binary (default: "git")
    binary_path: String,

    /// Bound on the fetch; an unreachable remote must not stall a run
    time_limit: Duration,
}

impl GitFetcher {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            binary_path: "git".to_string(),
            time_limit,
        }
    }

    /// Use a custom git binary (tests).
    pub fn with_binary_path(mut self, binary_path: impl Into<String>) -> Self {
        self.binary_path = binary_path.into();
        self
    }

    /// Clone `remote` into `dest`, which must not yet exist.
    ///
    /// The clone's exit status and stderr are captured verbatim into the
    /// error detail when the remote is unreachable, authentication fails,
    /// or the reference does not resolve.
    pub async fn clone_into(&self, remote: &str, dest: &Path) -> Result<PathBuf, DeployError> {
        info!(%remote, dest = %dest.display(), "cloning repository");

        let dest_str = dest.to_string_lossy();
        let cwd = dest.parent().unwrap_or_else(|| Path::new("."));

        let output: CommandOutput = run_command(
            &self.binary_path,
            &["clone", remote, dest_str.as_ref()],
            cwd,
            self.time_limit,
        )
        .await
        .map_err(|e| DeployError::Acquisition {
            remote: remote.to_string(),
            status: -1,
            stderr: e.to_string(),
        })?;

        if !output.success() {
            return Err(DeployError::Acquisition {
                remote: remote.to_string(),
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unresolvable_remote_is_an_acquisition_error() {
        let ws = tempfile::tempdir().unwrap();
        let fetcher = GitFetcher::new(Duration::from_secs(30));

        let result = fetcher
            .clone_into(
                ws.path().join("missing").to_str().unwrap(),
                &ws.path().join("source"),
            )
            .await;

        match result {
            Err(DeployError::Acquisition { stderr, .. }) => {
                assert!(!stderr.is_empty());
            }
            other => panic!("expected Acquisition error, got {:?}", other.map(|p| p.display().to_string())),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_acquisition_error() {
        let ws = tempfile::tempdir().unwrap();
        let fetcher =
            GitFetcher::new(Duration::from_secs(5)).with_binary_path("not-a-git-binary");

        let result = fetcher
            .clone_into("https://example.invalid/repo.git", &ws.path().join("source"))
            .await;

        assert!(matches!(result, Err(DeployError::Acquisition { .. })));
    }
}
