// ─── Version Manifest ───
// Handles fetching and parsing the Mojang version manifest v2.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{SyncError, SyncResult};
use crate::core::http::{get_json, RetryPolicy};
use crate::core::version::Target;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Oldest version the history walk goes back to.
pub const OLDEST_TRACKED_VERSION: &str = "b1.0";

/// Top-level Mojang version manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    /// Fetch the version manifest from Mojang using a shared HTTP client.
    pub async fn fetch(client: &reqwest::Client, retry: RetryPolicy) -> SyncResult<Self> {
        info!("Fetching Minecraft version manifest...");
        let manifest: VersionManifest = get_json(client, VERSION_MANIFEST_URL, retry).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// `latest` means the newest snapshot, which is also the newest release
    /// whenever no snapshot is in flight.
    pub fn resolve(&self, target: &Target) -> SyncResult<&VersionEntry> {
        let id = match target {
            Target::Latest => self.latest.snapshot.as_str(),
            Target::Version(id) => id.as_str(),
        };
        self.find_version(id)
            .ok_or_else(|| SyncError::NotFound(format!("Java Edition {id} is not in the manifest")))
    }

    /// Version ids from [`OLDEST_TRACKED_VERSION`] up to the newest, oldest
    /// first. The manifest lists newest first.
    pub fn history(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for entry in &self.versions {
            ids.push(entry.id.clone());
            if entry.id == OLDEST_TRACKED_VERSION {
                break;
            }
        }
        ids.reverse();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "latest": {"release": "1.20.4", "snapshot": "24w03a"},
        "versions": [
            {"id": "24w03a", "type": "snapshot", "url": "https://example.com/24w03a.json", "releaseTime": "2024-01-17T12:00:00+00:00"},
            {"id": "1.20.4", "type": "release", "url": "https://example.com/1.20.4.json", "releaseTime": "2023-12-07T12:00:00+00:00", "sha1": "abc123"},
            {"id": "b1.0", "type": "old_beta", "url": "https://example.com/b1.0.json", "releaseTime": "2010-12-19T22:00:00+00:00"},
            {"id": "a1.2.6", "type": "old_alpha", "url": "https://example.com/a1.2.6.json", "releaseTime": "2010-12-02T22:00:00+00:00"}
        ]
    }"#;

    fn manifest() -> VersionManifest {
        serde_json::from_str(MANIFEST).unwrap()
    }

    #[test]
    fn deserialize_manifest_entry() {
        let manifest = manifest();
        let entry = manifest.find_version("1.20.4").unwrap();
        assert_eq!(entry.version_type, "release");
        assert_eq!(entry.release_time, "2023-12-07T12:00:00+00:00");
        assert_eq!(entry.sha1.as_deref(), Some("abc123"));
    }

    #[test]
    fn latest_is_the_snapshot() {
        assert_eq!(manifest().resolve(&Target::Latest).unwrap().id, "24w03a");
        assert!(matches!(
            manifest().resolve(&Target::Version("1.99".into())),
            Err(SyncError::NotFound(_))
        ));
    }

    #[test]
    fn history_stops_at_first_beta() {
        assert_eq!(manifest().history(), vec!["b1.0", "1.20.4", "24w03a"]);
    }
}
