// ─── Java Edition Updater ───
// manifest → client JSON → client jar (+ asset index) → java/<version>/.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::asset_index::AssetIndex;
use super::client::{AssetIndexInfo, ClientJson};
use super::jar::{read_lang_files, source_file_name};
use super::manifest::{VersionEntry, VersionManifest};
use crate::core::downloader::Downloader;
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::{get_json, RetryPolicy};
use crate::core::lang::write_json_sibling;
use crate::core::ledger::{sha1_hex, FileHashes, Ledger};
use crate::core::staging::{read_file, write_file, StagingDir};
use crate::core::state::Settings;
use crate::core::version::Target;

/// Where Java Edition metadata and files come from.
#[async_trait]
pub trait JavaSource: Send + Sync {
    async fn manifest(&self) -> SyncResult<VersionManifest>;
    async fn client_json(&self, entry: &VersionEntry) -> SyncResult<ClientJson>;
    async fn asset_index(&self, info: &AssetIndexInfo) -> SyncResult<AssetIndex>;
    async fn download(&self, url: &str, dest: &Path, sha1: Option<&str>) -> SyncResult<PathBuf>;
}

/// Mojang's piston-meta and resources hosts.
pub struct MojangSource {
    downloader: Downloader,
    retry: RetryPolicy,
}

impl MojangSource {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            downloader: Downloader::new(client, retry),
            retry,
        }
    }
}

#[async_trait]
impl JavaSource for MojangSource {
    async fn manifest(&self) -> SyncResult<VersionManifest> {
        VersionManifest::fetch(self.downloader.client(), self.retry).await
    }

    async fn client_json(&self, entry: &VersionEntry) -> SyncResult<ClientJson> {
        info!(
            "Fetching client manifest \"{}\"",
            entry.url.rsplit('/').next().unwrap_or(&entry.url)
        );
        get_json(self.downloader.client(), &entry.url, self.retry).await
    }

    async fn asset_index(&self, info: &AssetIndexInfo) -> SyncResult<AssetIndex> {
        info!("Fetching asset index {}", info.id);
        get_json(self.downloader.client(), &info.url, self.retry).await
    }

    async fn download(&self, url: &str, dest: &Path, sha1: Option<&str>) -> SyncResult<PathBuf> {
        self.downloader.download_file(url, dest, sha1).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaOutcome {
    UpToDate {
        version: String,
    },
    Updated {
        version: String,
        files: usize,
        ledger_changed: bool,
    },
}

impl JavaOutcome {
    pub fn version(&self) -> &str {
        match self {
            JavaOutcome::UpToDate { version } | JavaOutcome::Updated { version, .. } => version,
        }
    }
}

pub struct JavaUpdater<'a> {
    settings: &'a Settings,
    source: &'a dyn JavaSource,
}

impl<'a> JavaUpdater<'a> {
    pub fn new(settings: &'a Settings, source: &'a dyn JavaSource) -> Self {
        Self { settings, source }
    }

    pub async fn manifest(&self) -> SyncResult<VersionManifest> {
        self.source.manifest().await
    }

    pub async fn run(&self, target: &Target) -> SyncResult<JavaOutcome> {
        let manifest = self.source.manifest().await?;
        self.run_with_manifest(&manifest, target).await
    }

    pub fn is_present(&self, version: &str) -> bool {
        self.settings.java_dir().join(version).is_dir()
    }

    pub async fn run_with_manifest(
        &self,
        manifest: &VersionManifest,
        target: &Target,
    ) -> SyncResult<JavaOutcome> {
        let settings = self.settings;
        let entry = manifest.resolve(target)?;
        let version = entry.id.clone();

        let mut ledger = Ledger::load(&settings.base_dir);
        let recorded = ledger.java.as_ref().is_some_and(|r| r.version == version);
        if recorded && self.is_present(&version) {
            info!("Java Edition {} is up to date", version);
            return Ok(JavaOutcome::UpToDate { version });
        }

        info!("Processing Java Edition {}", version);
        let client = self.source.client_json(entry).await?;
        let jar = client.client_download(&version)?;

        let jar_path = settings
            .packages_dir()
            .join(format!("Java_Edition_{version}.jar"));
        self.source
            .download(&jar.url, &jar_path, Some(&jar.sha1))
            .await?;

        let target_dir = settings.java_dir().join(&version);
        let staging = StagingDir::for_target(&target_dir)?;
        let mut hashes = FileHashes::new();

        let jar_files = read_lang_files(&jar_path, &settings.languages)?;
        for file in &jar_files {
            write_file(&staging.path().join(&file.file_name), &file.bytes)?;
            hashes.insert(file.file_name.clone(), sha1_hex(&file.bytes));
        }

        if jar_files.len() <= 1 {
            match &client.asset_index {
                Some(info) => {
                    let skip = source_file_name(&jar_files);
                    self.download_asset_langs(info, skip, staging.path(), &mut hashes)
                        .await?;
                }
                None => warn!("Java Edition {} has no asset index", version),
            }
        }

        if hashes.is_empty() {
            return Err(SyncError::NotFound(format!(
                "Java Edition {version} has no language files"
            )));
        }

        for name in hashes.keys().filter(|n| n.ends_with(".lang")) {
            let path = staging.path().join(name);
            write_json_sibling(&path, &read_file(&path)?)?;
        }

        // The tree lands last so a failed ledger write leaves the version missing.
        let files = hashes.len();
        let ledger_changed =
            Ledger::record(&mut ledger.java, &version, hashes, client.asset_index_value()?);
        if ledger_changed {
            ledger.save(&settings.base_dir)?;
        }

        staging.promote()?;
        if !settings.keep_packages {
            if let Err(e) = std::fs::remove_file(&jar_path) {
                warn!("Could not remove {:?}: {}", jar_path, e);
            }
        }

        info!("Java Edition {} done ({} language files)", version, files);
        Ok(JavaOutcome::Updated {
            version,
            files,
            ledger_changed,
        })
    }

    async fn download_asset_langs(
        &self,
        info: &AssetIndexInfo,
        skip: Option<&str>,
        dest_dir: &Path,
        hashes: &mut FileHashes,
    ) -> SyncResult<()> {
        let index = self.source.asset_index(info).await?;
        let objects = index.language_objects();
        let wanted: Vec<_> = objects
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != skip)
            .filter(|(name, _)| self.settings.languages.allows(name))
            .collect();
        info!("Downloading {} language files from asset index {}", wanted.len(), info.id);

        for (name, object) in wanted {
            debug!("Downloading language file \"{}\" ({})", name, object.hash);
            self.source
                .download(&object.url(), &dest_dir.join(name), Some(&object.hash))
                .await?;
            hashes.insert(name.clone(), object.hash.clone());
        }
        Ok(())
    }
}
