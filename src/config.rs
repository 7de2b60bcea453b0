//! Configuration for the deployment pipeline.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PERMALIFT_GATEWAY, PERMALIFT_LEDGER_RPC, ...)
//! 2. Config file (.permalift/config.yaml)
//! 3. Defaults
//!
//! Config file discovery searches the current directory and parents for
//! .permalift/config.yaml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    /// Keep run workspaces on disk for debugging
    #[serde(default)]
    pub keep_workspace: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Storage gateway base URL
    pub url: Option<String>,

    /// HTTP timeout for uploads and RPC calls, in seconds
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: Option<String>,
    pub program_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    pub clone_timeout_seconds: Option<u64>,
    pub install_timeout_seconds: Option<u64>,
    pub build_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishConfig {
    /// Glob patterns for files that must never be uploaded
    pub denylist_patterns: Option<Vec<String>>,
}

/// Resolved configuration with every default applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub gateway_url: String,
    pub ledger_rpc_url: String,
    pub ledger_program_id: String,

    pub clone_timeout: Duration,
    pub install_timeout: Duration,
    pub build_timeout: Duration,
    pub rpc_timeout: Duration,

    pub keep_workspace: bool,
    pub upload_denylist: Vec<String>,

    /// Path to the config file, when one was found
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://arweave.net".to_string(),
            ledger_rpc_url: "https://api.devnet.solana.com".to_string(),
            ledger_program_id: "DepLoyReg11111111111111111111111111111111111".to_string(),
            clone_timeout: Duration::from_secs(120),
            install_timeout: Duration::from_secs(900),
            build_timeout: Duration::from_secs(900),
            rpc_timeout: Duration::from_secs(60),
            keep_workspace: false,
            upload_denylist: vec![
                "**/.env*".to_string(),
                "**/*.pem".to_string(),
                "**/*.key".to_string(),
                "**/*credential*".to_string(),
            ],
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();
        let file = match &config_file {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let mut resolved = Self::from_file(file);
        resolved.config_file = config_file;
        resolved.apply_env();
        Ok(resolved)
    }

    fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();

        let seconds = Duration::from_secs;
        Self {
            gateway_url: file.gateway.url.unwrap_or(defaults.gateway_url),
            ledger_rpc_url: file.ledger.rpc_url.unwrap_or(defaults.ledger_rpc_url),
            ledger_program_id: file.ledger.program_id.unwrap_or(defaults.ledger_program_id),
            clone_timeout: file
                .build
                .clone_timeout_seconds
                .map(seconds)
                .unwrap_or(defaults.clone_timeout),
            install_timeout: file
                .build
                .install_timeout_seconds
                .map(seconds)
                .unwrap_or(defaults.install_timeout),
            build_timeout: file
                .build
                .build_timeout_seconds
                .map(seconds)
                .unwrap_or(defaults.build_timeout),
            rpc_timeout: file
                .gateway
                .timeout_seconds
                .map(seconds)
                .unwrap_or(defaults.rpc_timeout),
            keep_workspace: file.keep_workspace.unwrap_or(defaults.keep_workspace),
            upload_denylist: file
                .publish
                .denylist_patterns
                .unwrap_or(defaults.upload_denylist),
            config_file: None,
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("PERMALIFT_GATEWAY") {
            self.gateway_url = url;
        }
        if let Ok(url) = std::env::var("PERMALIFT_LEDGER_RPC") {
            self.ledger_rpc_url = url;
        }
        if let Ok(id) = std::env::var("PERMALIFT_PROGRAM_ID") {
            self.ledger_program_id = id;
        }
        if let Ok(keep) = std::env::var("PERMALIFT_KEEP_WORKSPACE") {
            self.keep_workspace = keep == "1" || keep.eq_ignore_ascii_case("true");
        }
    }
}

/// Find config file by searching current directory and parents, then the
/// user's home directory.
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".permalift").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home = dirs::home_dir()?;
    let config_path = home.join(".permalift").join("config.yaml");
    config_path.exists().then_some(config_path)
}

/// Load and parse a config file.
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolvedConfig::default();
        assert_eq!(config.gateway_url, "https://arweave.net");
        assert_eq!(config.install_timeout, Duration::from_secs(900));
        assert!(!config.keep_workspace);
        assert!(!config.upload_denylist.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
gateway:
  url: https://gw.example.com
  timeout_seconds: 10
build:
  build_timeout_seconds: 60
keep_workspace: true
"#,
        )
        .unwrap();

        let config = ResolvedConfig::from_file(file);
        assert_eq!(config.gateway_url, "https://gw.example.com");
        assert_eq!(config.rpc_timeout, Duration::from_secs(10));
        assert_eq!(config.build_timeout, Duration::from_secs(60));
        // Unset values keep their defaults.
        assert_eq!(config.clone_timeout, Duration::from_secs(120));
        assert!(config.keep_workspace);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let file: ConfigFile = serde_yaml::from_str("{}").unwrap();
        let config = ResolvedConfig::from_file(file);
        assert_eq!(config.ledger_rpc_url, ResolvedConfig::default().ledger_rpc_url);
    }

    #[test]
    fn test_denylist_override() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
publish:
  denylist_patterns:
    - "**/*.secret"
"#,
        )
        .unwrap();

        let config = ResolvedConfig::from_file(file);
        assert_eq!(config.upload_denylist, vec!["**/*.secret".to_string()]);
    }
}
