//! Publication to the content-addressed storage network.
//!
//! Every file in the output directory is uploaded as its own addressable
//! unit, then a manifest binding relative paths to file ids is uploaded
//! under the bundle's content id. Ids are content-derived (SHA-256), so
//! identical bytes always resolve to the identical id regardless of which
//! gateway accepted them.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use glob::Pattern;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::core::error::DeployError;
use crate::domain::{FileUrl, PublicationRecord, Tag};

/// Acknowledgement for one uploaded unit.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Whether the network has fully confirmed the unit. An accepted but
    /// unconfirmed upload is still propagating — a partial success, not a
    /// failure.
    pub confirmed: bool,
}

/// Seam to the storage network.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Upload one addressable unit under a content-derived id.
    async fn upload(
        &self,
        id: &str,
        relative_path: &str,
        bytes: Vec<u8>,
        tags: &[Tag],
    ) -> Result<UploadReceipt>;

    /// Resolvable URL for an uploaded unit.
    fn resolve_url(&self, id: &str) -> String;
}

/// HTTP gateway client, authenticated by the caller's signing credential.
pub struct HttpGateway {
    base_url: String,
    credential: Vec<u8>,
    client: reqwest::Client,
}

/// Gateway response for an upload.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    status: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, credential: Vec<u8>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
        }
    }
}

#[async_trait]
impl StorageGateway for HttpGateway {
    async fn upload(
        &self,
        id: &str,
        relative_path: &str,
        bytes: Vec<u8>,
        tags: &[Tag],
    ) -> Result<UploadReceipt> {
        let url = format!("{}/tx/{}", self.base_url, id);

        let data_part = Part::bytes(bytes)
            .file_name(relative_path.to_string())
            .mime_str(content_type_for(relative_path))?;

        let form = Form::new()
            .text("key", String::from_utf8_lossy(&self.credential).into_owned())
            .text("path", relative_path.to_string())
            .text("tags", serde_json::to_string(tags)?)
            .part("data", data_part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to upload '{}'", relative_path))?;

        let http_status = response.status();
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gateway rejected '{}' ({}): {}",
                relative_path,
                http_status,
                body.trim()
            );
        }

        // 202 means accepted but still propagating; the body's status field
        // can also report "pending" on a 200.
        let accepted_pending = http_status == reqwest::StatusCode::ACCEPTED;
        let body: UploadResponse = response.json().await.unwrap_or(UploadResponse { status: None });
        let body_pending = body.status.as_deref() == Some("pending");

        Ok(UploadReceipt {
            confirmed: !(accepted_pending || body_pending),
        })
    }

    fn resolve_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

/// Files never published, whatever the caller's tree contains.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    denylist_patterns: Vec<String>,
}

fn default_denylist() -> Vec<String> {
    vec![
        "**/.env*".to_string(),
        "**/*.pem".to_string(),
        "**/*.key".to_string(),
        "**/*credential*".to_string(),
    ]
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            denylist_patterns: default_denylist(),
        }
    }
}

impl UploadPolicy {
    pub fn new(denylist_patterns: Vec<String>) -> Self {
        Self { denylist_patterns }
    }

    /// Check a bundle-relative path against the denylist.
    pub fn is_denylisted(&self, relative_path: &str) -> bool {
        self.denylist_patterns.iter().any(|pattern_str| {
            Pattern::new(pattern_str)
                .map(|pattern| pattern.matches(relative_path))
                .unwrap_or(false)
        })
    }
}

/// Uploads an output directory and derives the bundle's identity.
pub struct ContentPublisher<G: StorageGateway> {
    gateway: G,
    policy: UploadPolicy,
}

impl<G: StorageGateway> ContentPublisher<G> {
    pub fn new(gateway: G, policy: UploadPolicy) -> Self {
        Self { gateway, policy }
    }

    /// Publish every file under `output_dir`, in lexicographic relative-path
    /// order. Total upload failure is fatal; unconfirmed uploads produce a
    /// partial-success record carrying per-file URLs.
    #[instrument(skip(self, output_dir, tags))]
    pub async fn publish(
        &self,
        output_dir: &Path,
        tags: &[Tag],
    ) -> Result<PublicationRecord, DeployError> {
        let files = enumerate_files(output_dir, &self.policy)?;
        if files.is_empty() {
            return Err(DeployError::Publication(
                "output directory contains no publishable files".to_string(),
            ));
        }

        info!(count = files.len(), "uploading bundle");

        let mut manifest_hasher = Sha256::new();
        let mut manifest_entries = Vec::with_capacity(files.len());
        let mut per_file = Vec::with_capacity(files.len());
        let mut all_confirmed = true;

        for relative in &files {
            let bytes = std::fs::read(output_dir.join(relative))
                .map_err(|source| DeployError::Workspace { source })?;
            let file_id = hex::encode(Sha256::digest(&bytes));

            // The bundle id commits to both the path layout and the bytes.
            manifest_hasher.update(relative.as_bytes());
            manifest_hasher.update([0u8]);
            manifest_hasher.update(file_id.as_bytes());

            let receipt = self
                .gateway
                .upload(&file_id, relative, bytes, tags)
                .await
                .map_err(|e| DeployError::Publication(e.to_string()))?;

            all_confirmed &= receipt.confirmed;
            per_file.push(FileUrl {
                path: relative.clone(),
                url: self.gateway.resolve_url(&file_id),
                confirmed: receipt.confirmed,
            });
            manifest_entries.push(serde_json::json!({ "path": relative, "id": file_id }));
        }

        let content_id = hex::encode(manifest_hasher.finalize());

        let manifest = serde_json::json!({ "version": 1, "files": manifest_entries });
        let manifest_bytes =
            serde_json::to_vec(&manifest).map_err(|e| DeployError::Publication(e.to_string()))?;
        let receipt = self
            .gateway
            .upload(&content_id, "manifest.json", manifest_bytes, tags)
            .await
            .map_err(|e| DeployError::Publication(e.to_string()))?;
        all_confirmed &= receipt.confirmed;

        let resolvable_url = self.gateway.resolve_url(&content_id);
        info!(%content_id, confirmed = all_confirmed, "bundle published");

        Ok(PublicationRecord {
            content_id,
            resolvable_url,
            per_file_urls: if all_confirmed { None } else { Some(per_file) },
        })
    }
}

/// Relative paths of publishable files, lexicographically ordered.
fn enumerate_files(output_dir: &Path, policy: &UploadPolicy) -> Result<Vec<String>, DeployError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(output_dir).min_depth(1) {
        let entry = entry.map_err(|e| DeployError::Workspace {
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error")),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(output_dir)
            .expect("walked entries live under the walk root")
            .to_string_lossy()
            .into_owned();

        if policy.is_denylisted(&relative) {
            warn!(path = %relative, "skipping denylisted file");
            continue;
        }

        files.push(relative);
    }

    files.sort();
    Ok(files)
}

/// Content-Type tag value derived from the file extension.
fn content_type_for(relative_path: &str) -> &'static str {
    let ext = Path::new(relative_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "txt" => "text/plain",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
