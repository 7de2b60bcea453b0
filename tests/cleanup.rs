//! Workspace Cleanup Invariant
//!
//! Lives in its own test binary: it redirects TMPDIR for the whole process
//! so the scan below only ever sees this run's workspaces.

use permalift::config::ResolvedConfig;
use permalift::core::Orchestrator;
use permalift::domain::DeployRequest;

#[tokio::test]
async fn failed_runs_leave_no_workspace_behind() {
    let temp_root = tempfile::tempdir().unwrap();
    std::env::set_var("TMPDIR", temp_root.path());

    let orchestrator = Orchestrator::new(ResolvedConfig::default());
    let result = orchestrator
        .deploy(DeployRequest::new(
            temp_root.path().join("no-repo").to_string_lossy(),
            b"wallet".to_vec(),
        ))
        .await;
    assert!(!result.success, "cloning a missing repository must fail");

    let leftovers: Vec<_> = std::fs::read_dir(temp_root.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("permalift-"))
        .collect();
    assert!(leftovers.is_empty(), "workspace survived a failed run");
}
