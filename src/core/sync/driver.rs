use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::git::Committer;
use super::Edition;
use crate::core::bedrock::{BedrockCatalog, BedrockOutcome, BedrockPipeline};
use crate::core::error::{SyncError, SyncResult};
use crate::core::java::{JavaOutcome, JavaUpdater, VersionManifest};
use crate::core::version::Target;

/// One edition as seen by the sync driver.
#[async_trait]
pub trait EditionPipeline: Send + Sync {
    fn edition(&self) -> Edition;

    /// Every version the upstream offers, oldest first.
    async fn available_versions(&self) -> SyncResult<Vec<String>>;

    fn is_present(&self, version: &str) -> bool;

    /// Process a single version. Returns whether anything on disk changed.
    async fn process(&self, version: &str) -> SyncResult<bool>;
}

// ── Bedrock ─────────────────────────────────────────────

pub struct BedrockEdition<'a> {
    pipeline: BedrockPipeline<'a>,
    catalog: OnceCell<BedrockCatalog>,
}

impl<'a> BedrockEdition<'a> {
    pub fn new(pipeline: BedrockPipeline<'a>) -> Self {
        Self {
            pipeline,
            catalog: OnceCell::new(),
        }
    }

    async fn catalog(&self) -> SyncResult<&BedrockCatalog> {
        self.catalog
            .get_or_try_init(|| self.pipeline.catalog())
            .await
    }
}

#[async_trait]
impl EditionPipeline for BedrockEdition<'_> {
    fn edition(&self) -> Edition {
        Edition::Bedrock
    }

    async fn available_versions(&self) -> SyncResult<Vec<String>> {
        Ok(self.catalog().await?.downloadable_versions())
    }

    fn is_present(&self, version: &str) -> bool {
        self.pipeline.is_present(version)
    }

    async fn process(&self, version: &str) -> SyncResult<bool> {
        let catalog = self.catalog().await?;
        let outcome = self
            .pipeline
            .run_with_catalog(catalog, &Target::Version(version.to_string()))
            .await?;
        Ok(matches!(outcome, BedrockOutcome::Updated { .. }))
    }
}

// ── Java ────────────────────────────────────────────────

pub struct JavaEdition<'a> {
    updater: JavaUpdater<'a>,
    manifest: OnceCell<VersionManifest>,
}

impl<'a> JavaEdition<'a> {
    pub fn new(updater: JavaUpdater<'a>) -> Self {
        Self {
            updater,
            manifest: OnceCell::new(),
        }
    }

    async fn manifest(&self) -> SyncResult<&VersionManifest> {
        self.manifest
            .get_or_try_init(|| self.updater.manifest())
            .await
    }
}

#[async_trait]
impl EditionPipeline for JavaEdition<'_> {
    fn edition(&self) -> Edition {
        Edition::Java
    }

    async fn available_versions(&self) -> SyncResult<Vec<String>> {
        Ok(self.manifest().await?.history())
    }

    fn is_present(&self, version: &str) -> bool {
        self.updater.is_present(version)
    }

    async fn process(&self, version: &str) -> SyncResult<bool> {
        let manifest = self.manifest().await?;
        let outcome = self
            .updater
            .run_with_manifest(manifest, &Target::Version(version.to_string()))
            .await?;
        Ok(matches!(outcome, JavaOutcome::Updated { .. }))
    }
}

// ── Driver ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub commit: bool,
    pub push: bool,
    /// Upper bound on versions processed per edition.
    pub limit: Option<usize>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            commit: true,
            push: false,
            limit: None,
        }
    }
}

#[derive(Debug)]
pub struct SyncFailure {
    pub edition: Edition,
    /// `None` when the version list itself could not be fetched.
    pub version: Option<String>,
    pub error: SyncError,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub processed: Vec<(Edition, String)>,
    pub committed: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncSummary {
    /// The first failure, if any, so the process exits with its kind.
    pub fn into_result(mut self) -> SyncResult<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let first = self.failures.remove(0);
        Err(first.error)
    }
}

pub struct Driver<'a> {
    committer: &'a dyn Committer,
    options: SyncOptions,
}

impl<'a> Driver<'a> {
    pub fn new(committer: &'a dyn Committer, options: SyncOptions) -> Self {
        Self { committer, options }
    }

    /// Versions `pipeline` offers that are not on disk yet, oldest first.
    pub async fn pending(&self, pipeline: &dyn EditionPipeline) -> SyncResult<Vec<String>> {
        let pending = pipeline
            .available_versions()
            .await?
            .into_iter()
            .filter(|v| !pipeline.is_present(v));
        Ok(match self.options.limit {
            Some(limit) => pending.take(limit).collect(),
            None => pending.collect(),
        })
    }

    /// Run every edition in turn. Version failures are collected; a source
    /// control failure stops the run.
    pub async fn run(&self, pipelines: &[&dyn EditionPipeline]) -> SyncResult<SyncSummary> {
        let mut summary = SyncSummary::default();

        for pipeline in pipelines {
            let edition = pipeline.edition();
            let pending = match self.pending(*pipeline).await {
                Ok(pending) => pending,
                Err(e) => {
                    warn!("Could not list {} versions: {}", edition, e);
                    summary.failures.push(SyncFailure {
                        edition,
                        version: None,
                        error: e,
                    });
                    continue;
                }
            };
            info!("{} {} version(s) to process", pending.len(), edition.display_name());

            for version in pending {
                match pipeline.process(&version).await {
                    Ok(changed) => {
                        if changed && self.options.commit {
                            let message = edition.commit_message(&version);
                            if self.committer.commit(&message)? {
                                summary.committed += 1;
                            }
                        }
                        summary.processed.push((edition, version));
                    }
                    Err(e) => {
                        warn!("Skipping {} {}: {}", edition.display_name(), version, e);
                        summary.failures.push(SyncFailure {
                            edition,
                            version: Some(version),
                            error: e,
                        });
                    }
                }
            }
        }

        if self.options.push && summary.committed > 0 {
            self.committer.push()?;
        }

        info!(
            "Sync finished: {} processed, {} committed, {} failed",
            summary.processed.len(),
            summary.committed,
            summary.failures.len()
        );
        Ok(summary)
    }
}
