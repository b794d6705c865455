// ─── Bedrock Pipeline ───
// fetch → extract → organise → merge → ledger → promote, for one version at a time.

use std::path::Path;

use tracing::{info, warn};

use super::catalog::BedrockCatalog;
use super::extractor::{ExtractContext, PackageExtractor};
use super::fetcher::{FetchOutcome, PackageFetcher, PackageSource};
use super::merge::Merger;
use super::organizer::organize;
use crate::core::credentials::Authenticator;
use crate::core::error::SyncResult;
use crate::core::ledger::Ledger;
use crate::core::staging::StagingDir;
use crate::core::state::Settings;
use crate::core::version::Target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedrockOutcome {
    UpToDate {
        version: String,
    },
    Updated {
        version: String,
        files: usize,
        ledger_changed: bool,
    },
}

impl BedrockOutcome {
    pub fn version(&self) -> &str {
        match self {
            BedrockOutcome::UpToDate { version } | BedrockOutcome::Updated { version, .. } => {
                version
            }
        }
    }
}

pub struct BedrockPipeline<'a> {
    settings: &'a Settings,
    source: &'a dyn PackageSource,
    extractor: &'a dyn PackageExtractor,
    auth: &'a dyn Authenticator,
}

impl<'a> BedrockPipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        source: &'a dyn PackageSource,
        extractor: &'a dyn PackageExtractor,
        auth: &'a dyn Authenticator,
    ) -> Self {
        Self {
            settings,
            source,
            extractor,
            auth,
        }
    }

    pub async fn catalog(&self) -> SyncResult<BedrockCatalog> {
        self.source.catalog().await
    }

    pub async fn run(&self, target: &Target) -> SyncResult<BedrockOutcome> {
        let catalog = self.source.catalog().await?;
        self.run_with_catalog(&catalog, target).await
    }

    /// Process one version against an already fetched catalog.
    pub async fn run_with_catalog(
        &self,
        catalog: &BedrockCatalog,
        target: &Target,
    ) -> SyncResult<BedrockOutcome> {
        let settings = self.settings;
        let mut ledger = Ledger::load(&settings.base_dir);
        let last_recorded = ledger
            .bedrock
            .as_ref()
            .map(|r| r.version.clone())
            .filter(|v| self.is_present(v));

        let fetcher = PackageFetcher::new(
            self.source,
            self.auth,
            settings.packages_dir(),
            settings.extracted_dir(),
        );
        let package = match fetcher
            .fetch(catalog, target, last_recorded.as_deref())
            .await?
        {
            FetchOutcome::UpToDate { version } => return Ok(BedrockOutcome::UpToDate { version }),
            FetchOutcome::Fetched(package) => package,
        };
        let version = package.version.clone();

        // Scratch space for the extractor; never promoted, removed on drop.
        let workspace = StagingDir::for_target(&settings.workspace_dir().join(&version))?;
        let output_dir = workspace.path().join("out");
        let files = self
            .extractor
            .extract(ExtractContext {
                package: &package,
                workspace: workspace.path(),
                output_dir: &output_dir,
            })
            .await?;

        let tree = organize(
            &output_dir,
            &files,
            &settings.extracted_dir().join(&version),
            &settings.languages,
        )?;
        drop(workspace);

        // Both trees stay staged until every step for this version succeeded.
        let merged = Merger::new(settings.extracted_dir(), settings.merged_dir())
            .stage(&version, tree.path())?;

        let file_count = tree.files.len();
        let ledger_changed =
            Ledger::record(&mut ledger.bedrock, &version, tree.files.clone(), None);
        if ledger_changed {
            ledger.save(&settings.base_dir)?;
        }

        let extracted = tree.promote()?;
        if let Err(e) = merged.promote() {
            // A version only counts as present with both trees on disk.
            if let Err(cleanup) = std::fs::remove_dir_all(&extracted) {
                warn!("Could not remove {:?}: {}", extracted, cleanup);
            }
            return Err(e);
        }

        if !settings.keep_packages {
            remove_package(&package.path);
        }

        info!("Bedrock {} done ({} language files)", version, file_count);
        Ok(BedrockOutcome::Updated {
            version,
            files: file_count,
            ledger_changed,
        })
    }

    /// Whether both `extracted/<version>` and `merged/<version>` are on disk.
    pub fn is_present(&self, version: &str) -> bool {
        self.settings.extracted_dir().join(version).is_dir()
            && self.settings.merged_dir().join(version).is_dir()
    }
}

fn remove_package(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!("Removed package {:?}", path),
        Err(e) => warn!("Could not remove package {:?}: {}", path, e),
    }
}
