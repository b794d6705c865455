// ─── Client Version File ───
// The per-version JSON the manifest points at; only the client jar and the
// asset index matter here.

use serde::{Deserialize, Serialize};

use crate::core::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientJson {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

/// Recorded verbatim in `versions.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

impl ClientJson {
    /// The client jar download, required for every tracked version.
    pub fn client_download(&self, version: &str) -> SyncResult<&DownloadArtifact> {
        self.downloads
            .as_ref()
            .and_then(|d| d.client.as_ref())
            .ok_or_else(|| {
                SyncError::NotFound(format!("Java Edition {version} has no client download"))
            })
    }

    pub fn asset_index_value(&self) -> SyncResult<Option<serde_json::Value>> {
        self.asset_index
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(SyncError::from)
    }
}
