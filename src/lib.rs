//! permalift - one-shot static-site deployment pipeline
//!
//! Clones a repository, classifies it, builds a static export, publishes
//! the result to a content-addressed storage network and optionally anchors
//! a signed record of the publication on a distributed ledger.
//!
//! # Architecture
//!
//! Each run is a fresh, isolated pipeline bound to its own workspace:
//! - Stages run strictly in sequence; each consumes its predecessor's output
//! - Nothing is retried; external-process diagnostics surface verbatim
//! - The workspace is removed exactly once, on every exit path
//!
//! # Modules
//!
//! - `adapters`: External system integrations (git, storage gateway, ledger)
//! - `core`: Pipeline logic (Workspace, analyzer, BuildExecutor, Orchestrator)
//! - `domain`: Data structures (ProjectDescriptor, PublicationRecord, ...)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Deploy a repository
//! permalift deploy https://github.com/user/site.git --storage-key wallet.json
//!
//! # Classify a local tree
//! permalift analyze ./my-site
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use config::ResolvedConfig;
pub use core::{DeployError, Orchestrator, Workspace};
pub use domain::{
    DeployRequest, ErrorKind, LedgerRegistration, PipelineResult, ProjectDescriptor, ProjectKind,
    PublicationRecord,
};
