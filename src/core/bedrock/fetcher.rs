// ─── Package Fetcher ───
// Resolves a Bedrock target against the catalog and downloads the package
// archive. Distribution access sits behind `PackageSource` so the pipeline can
// run against an in-memory catalog.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::{info, warn};

use super::catalog::{BedrockCatalog, BedrockRelease, BuildType, CATALOG_URL};
use super::fe3;
use crate::core::credentials::{Authenticator, Channel, ContentKey};
use crate::core::downloader::Downloader;
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::{ensure_success, with_retry, RetryPolicy, BROWSER_USER_AGENT};
use crate::core::version::Target;

const MIRROR_URL: &str = "https://dl.mcappx.com";

/// Where Bedrock packages come from.
#[async_trait]
pub trait PackageSource: Send + Sync {
    async fn catalog(&self) -> SyncResult<BedrockCatalog>;

    /// Download the x64 package of `release` into `dest_dir`.
    async fn download(&self, release: &BedrockRelease, dest_dir: &Path) -> SyncResult<PathBuf>;
}

/// mcappx.com catalog and mirror, with the store delivery service as the
/// fallback for UWP packages.
pub struct McappxSource {
    downloader: Downloader,
    retry: RetryPolicy,
}

impl McappxSource {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            downloader: Downloader::new(client, retry).with_user_agent(BROWSER_USER_AGENT),
            retry,
        }
    }
}

/// `1.21.0.3` → `https://dl.mcappx.com/be-1-21-0-3-x64-cn`.
pub fn mirror_url(id: &str) -> String {
    format!("{MIRROR_URL}/be-{}-x64-cn", id.replace('.', "-"))
}

#[async_trait]
impl PackageSource for McappxSource {
    async fn catalog(&self) -> SyncResult<BedrockCatalog> {
        info!("Fetching Bedrock catalog from {}", CATALOG_URL);
        let client = self.downloader.client();
        let body = with_retry(self.retry, CATALOG_URL, move || async move {
            let request = client.get(CATALOG_URL).header(USER_AGENT, BROWSER_USER_AGENT);
            let response = ensure_success(CATALOG_URL, request.send().await?)?;
            Ok(response.bytes().await?)
        })
        .await?;
        BedrockCatalog::parse(&body)
    }

    async fn download(&self, release: &BedrockRelease, dest_dir: &Path) -> SyncResult<PathBuf> {
        let dest = dest_dir.join(release.package_file_name());
        let hint = release.x64.as_ref().and_then(|v| v.download_hint());

        match release.build_type {
            BuildType::Gdk => {
                let url = hint.ok_or_else(|| {
                    SyncError::NotFound(format!("Bedrock {} has no package URL", release.version))
                })?;
                self.downloader.download_file(&url, &dest, None).await
            }
            BuildType::Uwp => {
                let mirror = mirror_url(&release.id);
                match self.downloader.download_file(&mirror, &dest, None).await {
                    Ok(path) => Ok(path),
                    Err(err) => {
                        let Some(update_id) = hint else {
                            return Err(err);
                        };
                        warn!("Mirror download failed ({}), asking the store for {}", err, update_id);
                        let url = fe3::resolve_package_url(&update_id, self.retry).await?;
                        self.downloader.download_file(&url, &dest, None).await
                    }
                }
            }
            BuildType::Unknown => Err(SyncError::NotFound(format!(
                "Bedrock {} has an unsupported build type",
                release.version
            ))),
        }
    }
}

/// A downloaded package ready for extraction.
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    pub version: String,
    pub build_type: BuildType,
    pub channel: Channel,
    pub path: PathBuf,
    /// Key for the package channel, when one was supplied.
    pub key: Option<ContentKey>,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// The resolved version is already recorded and on disk.
    UpToDate { version: String },
    Fetched(FetchedPackage),
}

pub struct PackageFetcher<'a> {
    source: &'a dyn PackageSource,
    auth: &'a dyn Authenticator,
    packages_dir: PathBuf,
    extracted_dir: PathBuf,
}

impl<'a> PackageFetcher<'a> {
    pub fn new(
        source: &'a dyn PackageSource,
        auth: &'a dyn Authenticator,
        packages_dir: PathBuf,
        extracted_dir: PathBuf,
    ) -> Self {
        Self {
            source,
            auth,
            packages_dir,
            extracted_dir,
        }
    }

    pub async fn fetch(
        &self,
        catalog: &BedrockCatalog,
        target: &Target,
        last_recorded: Option<&str>,
    ) -> SyncResult<FetchOutcome> {
        let release = catalog.resolve(target)?;
        let version = release.version.clone();

        if last_recorded == Some(version.as_str()) && self.extracted_dir.join(&version).is_dir() {
            info!("Bedrock {} is up to date", version);
            return Ok(FetchOutcome::UpToDate { version });
        }

        let channel = release.channel();
        let key = self.auth.content_key(channel).cloned();
        if release.build_type == BuildType::Gdk && key.is_none() {
            return Err(SyncError::Auth(format!(
                "no {channel} key available to decrypt Bedrock {version}"
            )));
        }

        info!(
            "Downloading Bedrock {} ({:?}, {} channel)",
            version, release.build_type, channel
        );
        let path = self.source.download(release, &self.packages_dir).await?;
        Ok(FetchOutcome::Fetched(FetchedPackage {
            version,
            build_type: release.build_type,
            channel,
            path,
            key,
        }))
    }
}
