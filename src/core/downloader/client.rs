use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{SyncError, SyncResult};
use crate::core::http::{ensure_success, with_retry, RetryPolicy};

const MIB: u64 = 1024 * 1024;
/// Without a content length, log every this many bytes.
const UNSIZED_LOG_STEP: u64 = 50 * MIB;

/// Logs download progress in coarse steps so CI logs stay readable.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub file_name: String,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    last_step: u64,
}

impl DownloadProgress {
    pub fn new(file_name: String, total_bytes: Option<u64>) -> Self {
        Self {
            file_name,
            bytes_downloaded: 0,
            total_bytes: total_bytes.filter(|t| *t > 0),
            last_step: 0,
        }
    }

    /// Account for `n` more bytes; returns the step that was just crossed.
    pub fn advance(&mut self, n: u64) -> Option<u64> {
        self.bytes_downloaded = self.bytes_downloaded.saturating_add(n);
        let step = match self.total_bytes {
            Some(total) => self.bytes_downloaded.saturating_mul(10) / total,
            None => self.bytes_downloaded / UNSIZED_LOG_STEP,
        };
        if step > self.last_step {
            self.last_step = step;
            Some(step)
        } else {
            None
        }
    }

    fn log(&self) {
        let downloaded_mb = self.bytes_downloaded as f64 / MIB as f64;
        match self.total_bytes {
            Some(total) => info!(
                "  {}: {:.0}% ({:.1}/{:.1} MB)",
                self.file_name,
                self.bytes_downloaded as f64 * 100.0 / total as f64,
                downloaded_mb,
                total as f64 / MIB as f64
            ),
            None => info!("  {}: {:.0} MB", self.file_name, downloaded_mb),
        }
    }
}

/// Sequential, SHA-1 validated downloader with bounded retries.
pub struct Downloader {
    client: Client,
    retry: RetryPolicy,
    user_agent: Option<&'static str>,
}

impl Downloader {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            user_agent: None,
        }
    }

    /// Override the client's user agent for mirrors that insist on a browser.
    pub fn with_user_agent(mut self, agent: &'static str) -> Self {
        self.user_agent = Some(agent);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, reusing an existing file when it is valid.
    ///
    /// The body is streamed into `<dest>.part` and renamed on success, so an
    /// interrupted download never leaves a file that looks complete.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> SyncResult<PathBuf> {
        if dest.exists() {
            let valid = match sha1_expected {
                Some(expected) => Self::validate_sha1(dest, expected).await?,
                None => true,
            };
            if valid {
                debug!("Already downloaded: {:?}", dest);
                return Ok(dest.to_path_buf());
            }
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }

        info!("Downloading {}", url);
        with_retry(self.retry, url, move || self.stream_once(url, dest, sha1_expected)).await?;
        Ok(dest.to_path_buf())
    }

    async fn stream_once(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> SyncResult<()> {
        let mut request = self.client.get(url);
        if let Some(agent) = self.user_agent {
            request = request.header(USER_AGENT, agent);
        }
        let response = ensure_success(url, request.send().await?)?;

        let part_path = part_path(dest);
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut progress = DownloadProgress::new(file_name, response.content_length());
        let mut hasher = Sha1::new();

        // Scoped so the handle is closed before the rename below.
        {
            let mut file = tokio::fs::File::create(&part_path)
                .await
                .map_err(|e| SyncError::io(&part_path, e))?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tokio::fs::remove_file(&part_path).await;
                        return Err(e.into());
                    }
                };
                hasher.update(&chunk);
                file.write_all(&chunk)
                    .await
                    .map_err(|e| SyncError::io(&part_path, e))?;
                if progress.advance(chunk.len() as u64).is_some() {
                    progress.log();
                }
            }
            file.flush().await.map_err(|e| SyncError::io(&part_path, e))?;
        }

        if let Some(expected) = sha1_expected {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(SyncError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        tokio::fs::rename(&part_path, dest)
            .await
            .map_err(|e| SyncError::io(dest, e))?;
        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, progress.bytes_downloaded);
        Ok(())
    }

    /// Validate an existing file's SHA-1.
    pub async fn validate_sha1(path: &Path, expected: &str) -> SyncResult<bool> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SyncError::io(path, e))?;
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        let actual = hex::encode(hasher.finalize());
        Ok(actual.eq_ignore_ascii_case(expected))
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
