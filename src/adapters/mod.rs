//! Adapters for external systems.
//!
//! The pipeline coordinates three kinds of externals: OS processes (git,
//! npm), the content-addressed storage gateway, and the ledger RPC node.
//! Each adapter captures diagnostics for the caller; none of them retry.

pub mod git;
pub mod ledger;
pub mod storage;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::time::timeout;

pub use git::GitFetcher;
pub use ledger::{LedgerKeypair, LedgerRegistrar};
pub use storage::{ContentPublisher, HttpGateway, StorageGateway, UploadPolicy, UploadReceipt};

/// Captured result of one external process invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (-1 when the process was killed by a signal)
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run an external process to completion, capturing stdout/stderr.
///
/// Output is captured, never streamed. The timeout bounds otherwise
/// unbounded installs/builds; expiry kills the child and surfaces as an
/// error carrying the elapsed bound.
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    time_limit: Duration,
) -> Result<CommandOutput> {
    let rendered = render_command(program, args);

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", rendered))?;

    let output = timeout(time_limit, child.wait_with_output())
        .await
        .map_err(|_| anyhow::anyhow!("'{}' timed out after {:?}", rendered, time_limit))?
        .with_context(|| format!("Failed to wait for '{}'", rendered))?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Render a program + args as a single display string for diagnostics.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program);
    parts.extend_from_slice(args);
    parts.join(" ")
}
