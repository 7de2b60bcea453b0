//! Pipeline orchestration.
//!
//! Sequences acquisition, analysis, build, publication and the optional
//! ledger registration for one run. Stages are strictly sequential — each
//! consumes the previous stage's output — and nothing is retried. The first
//! failure before a confirmed publication is fatal; afterwards, only the
//! registration outcome can vary, and it never fails the run.

use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::adapters::{
    ContentPublisher, GitFetcher, HttpGateway, LedgerKeypair, LedgerRegistrar, UploadPolicy,
};
use crate::config::ResolvedConfig;
use crate::domain::{
    DeployRequest, FailureDetail, PipelineResult, ProjectDescriptor, PublicationRecord, Tag,
};

use super::analyzer;
use super::builder::BuildExecutor;
use super::error::DeployError;
use super::workspace::Workspace;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Init,
    Acquiring,
    Analyzing,
    Building,
    Publishing,
    Registering,
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeployStage::Init => "init",
            DeployStage::Acquiring => "acquiring",
            DeployStage::Analyzing => "analyzing",
            DeployStage::Building => "building",
            DeployStage::Publishing => "publishing",
            DeployStage::Registering => "registering",
        };
        write!(f, "{}", name)
    }
}

/// Runs deployment pipelines against a resolved configuration.
pub struct Orchestrator {
    config: ResolvedConfig,
}

impl Orchestrator {
    pub fn new(config: ResolvedConfig) -> Self {
        Self { config }
    }

    /// Execute one full pipeline run.
    ///
    /// Never returns an `Err`: every outcome, fatal or not, is folded into
    /// the `PipelineResult` contract.
    #[instrument(skip(self, request), fields(repo = %request.repo_url))]
    pub async fn deploy(&self, request: DeployRequest) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, stage = %DeployStage::Init, "starting deployment");

        // Validate inputs and parse credentials before any external work.
        let payer = match validate_request(&request) {
            Ok(payer) => payer,
            Err(e) => return self.failed(run_id, started_at, None, e),
        };

        let mut workspace = match Workspace::create() {
            Ok(ws) => ws,
            Err(e) => return self.failed(run_id, started_at, None, e),
        };
        if self.config.keep_workspace {
            workspace.retain();
        }

        let mut project = None;
        let outcome = self
            .run_stages(&request, &workspace, &mut project)
            .await;

        let result = match outcome {
            Ok(publication) => {
                let registration = match payer {
                    Some(payer) => {
                        info!(stage = %DeployStage::Registering, run = %run_id, "stage started");
                        let registrar = LedgerRegistrar::new(
                            self.config.ledger_rpc_url.clone(),
                            self.config.ledger_program_id.clone(),
                            self.config.rpc_timeout,
                        );
                        let label = request.label.clone().unwrap_or_default();
                        Some(
                            registrar
                                .register(&publication.content_id, &label, &payer)
                                .await,
                        )
                    }
                    None => None,
                };

                let partial = publication.is_partial();
                info!(%run_id, content_id = %publication.content_id, partial, "deployment done");

                PipelineResult {
                    run_id,
                    success: true,
                    partial_publication: partial,
                    project,
                    publication: Some(publication),
                    registration,
                    error: None,
                    started_at,
                    finished_at: Utc::now(),
                }
            }
            Err(e) => self.failed(run_id, started_at, project, e),
        };

        // Terminal state reached; the workspace is released exactly once,
        // here, whatever happened above.
        drop(workspace);

        result
    }

    /// The fatal-on-first-failure portion: Acquiring through Publishing.
    async fn run_stages(
        &self,
        request: &DeployRequest,
        workspace: &Workspace,
        project: &mut Option<ProjectDescriptor>,
    ) -> Result<PublicationRecord, DeployError> {
        info!(stage = %DeployStage::Acquiring, "stage started");
        let fetcher = GitFetcher::new(self.config.clone_timeout);
        let source_root = fetcher
            .clone_into(&request.repo_url, &workspace.path().join("source"))
            .await?;

        info!(stage = %DeployStage::Analyzing, "stage started");
        let descriptor = analyzer::analyze(&source_root);
        info!(kind = %descriptor.kind, has_manifest = descriptor.has_manifest, "project classified");
        *project = Some(descriptor.clone());

        info!(stage = %DeployStage::Building, "stage started");
        let output_dir = workspace.subdir("site")?;
        let builder = BuildExecutor::new(self.config.install_timeout, self.config.build_timeout);
        builder.build(&source_root, &descriptor, &output_dir).await?;

        info!(stage = %DeployStage::Publishing, "stage started");
        let tags = upload_tags(&descriptor, request);
        let gateway = HttpGateway::new(
            self.config.gateway_url.clone(),
            request.storage_key.clone(),
            self.config.rpc_timeout,
        );
        let publisher = ContentPublisher::new(
            gateway,
            UploadPolicy::new(self.config.upload_denylist.clone()),
        );
        publisher.publish(&output_dir, &tags).await
    }

    fn failed(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        project: Option<ProjectDescriptor>,
        e: DeployError,
    ) -> PipelineResult {
        error!(%run_id, kind = ?e.kind(), error = %e, "deployment failed");

        PipelineResult {
            run_id,
            success: false,
            partial_publication: false,
            project,
            publication: None,
            registration: None,
            error: Some(FailureDetail {
                kind: e.kind(),
                message: e.to_string(),
            }),
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Check required inputs and parse the optional ledger credential.
///
/// Runs before any external call so caller-fixable problems cost nothing.
fn validate_request(request: &DeployRequest) -> Result<Option<LedgerKeypair>, DeployError> {
    if request.repo_url.trim().is_empty() {
        return Err(DeployError::MissingInput("repository URL"));
    }
    if request.storage_key.is_empty() {
        return Err(DeployError::MissingInput("storage credential"));
    }

    request
        .ledger_key
        .as_deref()
        .map(LedgerKeypair::from_json_bytes)
        .transpose()
}

/// Standard upload tags, in protocol order, followed by the caller's.
fn upload_tags(descriptor: &ProjectDescriptor, request: &DeployRequest) -> Vec<Tag> {
    let mut tags = vec![
        Tag::new("App-Name", "permalift"),
        Tag::new("Project-Type", descriptor.kind.to_string()),
    ];
    if let Some(label) = &request.label {
        tags.push(Tag::new("Label", label.clone()));
    }
    tags.extend(request.extra_tags.iter().cloned());
    tags
}
