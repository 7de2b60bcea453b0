//! Failure taxonomy for the deployment pipeline.
//!
//! One variant per caller-visible failure kind. External-process failures
//! carry the process's exit status and captured error stream verbatim;
//! nothing is collapsed into a generic message.

use thiserror::Error;

use crate::domain::ErrorKind;

/// A fatal pipeline failure.
///
/// Registration failures are deliberately not represented here: they are
/// reported alongside a successful result, never as an error.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("invalid credential ({which}): {reason}")]
    Credential { which: &'static str, reason: String },

    #[error("workspace setup failed: {source}")]
    Workspace {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch '{remote}' (exit status {status}): {stderr}")]
    Acquisition {
        remote: String,
        status: i32,
        stderr: String,
    },

    #[error("no build recipe for this project tree")]
    UnsupportedProjectKind,

    #[error("'{command}' exited with status {status}\nstdout: {stdout}\nstderr: {stderr}")]
    BuildCommandFailed {
        command: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("build completed but expected output directory '{expected}' was not produced")]
    BuildOutputMissing { expected: String },

    #[error("publication failed: {0}")]
    Publication(String),
}

impl DeployError {
    /// Stable classification reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::MissingInput(_) => ErrorKind::InputValidation,
            DeployError::Credential { .. } => ErrorKind::Credential,
            DeployError::Workspace { .. } => ErrorKind::Workspace,
            DeployError::Acquisition { .. } => ErrorKind::Acquisition,
            DeployError::UnsupportedProjectKind => ErrorKind::UnsupportedProjectKind,
            DeployError::BuildCommandFailed { .. } => ErrorKind::BuildCommandFailed,
            DeployError::BuildOutputMissing { .. } => ErrorKind::BuildOutputMissing,
            DeployError::Publication(_) => ErrorKind::Publication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            DeployError::MissingInput("repository URL").kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            DeployError::UnsupportedProjectKind.kind(),
            ErrorKind::UnsupportedProjectKind
        );
        assert_eq!(
            DeployError::Publication("gateway unreachable".to_string()).kind(),
            ErrorKind::Publication
        );
    }

    #[test]
    fn test_build_failure_message_carries_diagnostics_verbatim() {
        let err = DeployError::BuildCommandFailed {
            command: "npm run build".to_string(),
            status: 2,
            stdout: "compiling".to_string(),
            stderr: "error TS2304: cannot find name".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("npm run build"));
        assert!(message.contains("status 2"));
        assert!(message.contains("error TS2304: cannot find name"));
    }
}
