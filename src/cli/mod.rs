//! Command-line interface for permalift.
//!
//! Provides commands for running deployments, classifying local trees,
//! and inspecting the resolved configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::ResolvedConfig;
use crate::core::{analyze, Orchestrator};
use crate::domain::{DeployRequest, PipelineResult, Tag};

/// permalift - build a repository and publish it to permanent storage
#[derive(Parser, Debug)]
#[command(name = "permalift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clone, build, publish and optionally register a repository
    Deploy {
        /// Remote repository reference (anything git clone accepts)
        repo_url: String,

        /// Storage network signing credential file
        #[arg(short, long)]
        storage_key: PathBuf,

        /// Ledger keypair file (JSON byte array); enables registration
        #[arg(short, long)]
        ledger_key: Option<PathBuf>,

        /// Label bound to the publication on the ledger
        #[arg(long)]
        label: Option<String>,

        /// Extra upload tag, name=value (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Keep the run's workspace on disk for debugging
        #[arg(long)]
        keep_workspace: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a local source tree without deploying it
    Analyze {
        /// Path to the tree root
        path: PathBuf,

        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Deploy {
                repo_url,
                storage_key,
                ledger_key,
                label,
                tags,
                keep_workspace,
                json,
            } => {
                deploy(
                    &repo_url,
                    &storage_key,
                    ledger_key.as_deref(),
                    label,
                    &tags,
                    keep_workspace,
                    json,
                )
                .await
            }
            Commands::Analyze { path, json } => analyze_tree(&path, json),
            Commands::Config => show_config(),
        }
    }
}

/// Run the full pipeline and report the result.
#[allow(clippy::too_many_arguments)]
async fn deploy(
    repo_url: &str,
    storage_key_path: &Path,
    ledger_key_path: Option<&Path>,
    label: Option<String>,
    raw_tags: &[String],
    keep_workspace: bool,
    json: bool,
) -> Result<()> {
    let mut config = ResolvedConfig::load()?;
    if keep_workspace {
        config.keep_workspace = true;
    }

    let storage_key = std::fs::read(storage_key_path).with_context(|| {
        format!(
            "Failed to read storage credential: {}",
            storage_key_path.display()
        )
    })?;

    let ledger_key = match ledger_key_path {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("Failed to read ledger keypair: {}", path.display()))?,
        ),
        None => None,
    };

    let extra_tags = parse_tags(raw_tags)?;

    let request = DeployRequest {
        repo_url: repo_url.to_string(),
        storage_key,
        ledger_key,
        label,
        extra_tags,
    };

    let orchestrator = Orchestrator::new(config);
    let result = orchestrator.deploy(request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Parse repeated `name=value` tag arguments.
fn parse_tags(raw_tags: &[String]) -> Result<Vec<Tag>> {
    raw_tags
        .iter()
        .map(|raw| {
            Tag::parse(raw).with_context(|| format!("Invalid tag '{}', expected name=value", raw))
        })
        .collect()
}

/// Human-readable deployment report.
fn print_report(result: &PipelineResult) {
    println!("Run ID: {}", result.run_id);

    if let Some(project) = &result.project {
        println!("Project: {} (manifest: {})", project.kind, project.has_manifest);
    }

    match (&result.publication, &result.error) {
        (Some(publication), _) => {
            println!("Content ID: {}", publication.content_id);
            println!("URL: {}", publication.resolvable_url);

            if let Some(per_file) = &publication.per_file_urls {
                let pending = per_file.iter().filter(|f| !f.confirmed).count();
                println!(
                    "Partial publication: {} of {} files still propagating",
                    pending,
                    per_file.len()
                );
                for file in per_file {
                    let marker = if file.confirmed { "ok" } else { "pending" };
                    println!("  [{}] {} -> {}", marker, file.path, file.url);
                }
            }
        }
        (None, Some(error)) => {
            eprintln!("Deployment failed ({:?}):", error.kind);
            eprintln!("{}", error.message);
        }
        (None, None) => {}
    }

    match &result.registration {
        Some(registration) if registration.succeeded => {
            println!(
                "Ledger registration: {}",
                registration.signature.as_deref().unwrap_or_default()
            );
        }
        Some(registration) => {
            println!(
                "Ledger registration failed: {}",
                registration.reason.as_deref().unwrap_or("unknown")
            );
        }
        None => {}
    }
}

/// Classify a local tree (no side effects).
fn analyze_tree(path: &Path, json: bool) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }

    let descriptor = analyze(path);

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        println!("Kind: {}", descriptor.kind);
        println!("Manifest: {}", descriptor.has_manifest);
        if let Some(command) = &descriptor.build_command {
            println!("Build command: {}", command);
        }
        if let Some(version) = &descriptor.framework_version {
            println!("Version: {}", version);
        }
    }

    Ok(())
}

/// Print the resolved configuration.
fn show_config() -> Result<()> {
    let config = ResolvedConfig::load()?;

    println!("Gateway: {}", config.gateway_url);
    println!("Ledger RPC: {}", config.ledger_rpc_url);
    println!("Ledger program: {}", config.ledger_program_id);
    println!("Clone timeout: {:?}", config.clone_timeout);
    println!("Install timeout: {:?}", config.install_timeout);
    println!("Build timeout: {:?}", config.build_timeout);
    println!("Keep workspace: {}", config.keep_workspace);
    println!("Upload denylist: {:?}", config.upload_denylist);
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none found, using defaults)"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(&["Env=production".to_string(), "Team=web".to_string()]).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "Env");
        assert_eq!(tags[1].value, "web");
    }

    #[test]
    fn test_parse_tags_rejects_malformed() {
        assert!(parse_tags(&["no-separator".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_deploy_command() {
        let cli = Cli::try_parse_from([
            "permalift",
            "deploy",
            "https://example.com/site.git",
            "--storage-key",
            "wallet.json",
            "--tag",
            "Env=staging",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Deploy {
                repo_url,
                tags,
                json,
                keep_workspace,
                ..
            } => {
                assert_eq!(repo_url, "https://example.com/site.git");
                assert_eq!(tags, vec!["Env=staging".to_string()]);
                assert!(json);
                assert!(!keep_workspace);
            }
            other => panic!("expected Deploy, got {:?}", other),
        }
    }
}
