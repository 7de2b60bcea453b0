//! Pipeline Integration Tests
//!
//! End-to-end orchestrator behavior short of the network: input validation,
//! acquisition failure, and the workspace cleanup invariant.

use permalift::config::ResolvedConfig;
use permalift::core::Orchestrator;
use permalift::domain::{DeployRequest, ErrorKind};

#[tokio::test]
async fn missing_inputs_map_to_400_without_external_calls() {
    let orchestrator = Orchestrator::new(ResolvedConfig::default());

    let no_repo = orchestrator
        .deploy(DeployRequest::new("", b"wallet".to_vec()))
        .await;
    assert!(!no_repo.success);
    assert_eq!(no_repo.http_status(), 400);
    assert_eq!(no_repo.error.unwrap().kind, ErrorKind::InputValidation);

    let no_key = orchestrator
        .deploy(DeployRequest::new("https://example.com/a.git", Vec::new()))
        .await;
    assert_eq!(no_key.http_status(), 400);
}

#[tokio::test]
async fn acquisition_failure_carries_the_fetch_diagnostic() {
    let scratch = tempfile::tempdir().unwrap();
    let missing_repo = scratch.path().join("definitely-missing");

    let orchestrator = Orchestrator::new(ResolvedConfig::default());
    let result = orchestrator
        .deploy(DeployRequest::new(
            missing_repo.to_string_lossy(),
            b"wallet".to_vec(),
        ))
        .await;

    assert!(!result.success);
    assert_eq!(result.http_status(), 500);

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Acquisition);
    // The git exit status and stderr are surfaced, not a generic message.
    assert!(error.message.contains("exit status"));
}
