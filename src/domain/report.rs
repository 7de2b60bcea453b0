//! Deploy requests and the aggregate pipeline result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::descriptor::ProjectDescriptor;
use super::record::{LedgerRegistration, PublicationRecord, Tag};

/// Everything the caller hands the orchestrator for one run.
///
/// Credentials arrive as opaque bytes (file contents); the transport layer
/// that extracted them is not this crate's concern.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Remote repository reference (anything `git clone` accepts)
    pub repo_url: String,

    /// Storage network signing credential, verbatim file contents
    pub storage_key: Vec<u8>,

    /// Optional ledger signing credential (JSON byte-array keypair)
    pub ledger_key: Option<Vec<u8>>,

    /// Optional human-chosen label bound to the publication on the ledger
    pub label: Option<String>,

    /// Caller-supplied tags appended to every upload
    pub extra_tags: Vec<Tag>,
}

impl DeployRequest {
    pub fn new(repo_url: impl Into<String>, storage_key: Vec<u8>) -> Self {
        Self {
            repo_url: repo_url.into(),
            storage_key,
            ledger_key: None,
            label: None,
            extra_tags: Vec::new(),
        }
    }
}

/// Stable failure classification reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required input missing — no external calls were made
    InputValidation,

    /// Credential file unreadable or malformed — caller-fixable
    Credential,

    /// Remote fetch failed
    Acquisition,

    /// No build recipe exists for the tree
    UnsupportedProjectKind,

    /// Install/build process exited non-zero
    BuildCommandFailed,

    /// Build exited zero but the conventional export directory is absent
    BuildOutputMissing,

    /// Total upload failure
    Publication,

    /// Workspace setup or filesystem failure
    Workspace,
}

impl ErrorKind {
    /// Whether the caller can fix this without operator involvement.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(self, ErrorKind::InputValidation | ErrorKind::Credential)
    }
}

/// Failure details surfaced verbatim to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: ErrorKind,

    /// Includes the failing process's exit status and error stream, unedited
    pub message: String,
}

/// The aggregate result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier (also the workspace name suffix)
    pub run_id: Uuid,

    /// True whenever publication succeeded, fully or partially
    pub success: bool,

    /// True when some uploaded files are still propagating
    pub partial_publication: bool,

    /// Classification of the acquired tree, when analysis ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectDescriptor>,

    /// Publication record, present iff `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication: Option<PublicationRecord>,

    /// Registration outcome, present iff a ledger credential was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<LedgerRegistration>,

    /// Failure details, present iff not `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    /// HTTP status the transport layer should map this result to.
    ///
    /// 200 for any success (including partial publication or a failed
    /// registration), 400 for caller-fixable input problems, 500 otherwise.
    pub fn http_status(&self) -> u16 {
        if self.success {
            return 200;
        }
        match &self.error {
            Some(detail) if detail.kind.is_caller_fixable() => 400,
            _ => 500,
        }
    }
}
