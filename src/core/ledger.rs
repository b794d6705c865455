// ─── Version Ledger ───
// `versions.json` at the repository root records, per edition, the last
// processed version and the SHA-1 of every exported language file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{SyncError, SyncResult};

pub const LEDGER_FILE: &str = "versions.json";

/// Relative language file path → SHA-1 hex.
pub type FileHashes = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditionRecord {
    pub update_time: DateTime<Utc>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<serde_json::Value>,
    #[serde(default)]
    pub sha1: FileHashes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ledger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java: Option<EditionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrock: Option<EditionRecord>,
}

impl Ledger {
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(LEDGER_FILE)
    }

    /// Load the ledger; a missing or unreadable file yields an empty one.
    pub fn load(base_dir: &Path) -> Self {
        let path = Self::path(base_dir);
        let Ok(raw) = std::fs::read(&path) else {
            return Self::default();
        };
        match serde_json::from_slice(&raw) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!("Could not read existing {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Replace `versions.json` through a temp file so readers never see a
    /// half-written document.
    pub fn save(&self, base_dir: &Path) -> SyncResult<()> {
        let path = Self::path(base_dir);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&tmp, json).map_err(|e| SyncError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| SyncError::io(&path, e))?;
        Ok(())
    }

    /// Store a new record when its hashes differ from the recorded ones.
    ///
    /// Returns `true` if the ledger changed.
    pub fn record(
        slot: &mut Option<EditionRecord>,
        version: &str,
        sha1: FileHashes,
        asset_index: Option<serde_json::Value>,
    ) -> bool {
        if slot.as_ref().is_some_and(|r| r.sha1 == sha1 && r.version == version) {
            return false;
        }
        info!("Recording {} language files for {}", sha1.len(), version);
        *slot = Some(EditionRecord {
            update_time: Utc::now(),
            version: version.to_string(),
            asset_index,
            sha1,
        });
        true
    }
}

/// SHA-1 hex of a byte buffer.
pub fn sha1_hex(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(pairs: &[(&str, &str)]) -> FileHashes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sha1_matches_known_digest() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn unchanged_hashes_do_not_touch_the_record() {
        let mut slot = None;
        assert!(Ledger::record(&mut slot, "1.20.1", hashes(&[("en_US.lang", "aa")]), None));
        let before = slot.clone();
        assert!(!Ledger::record(&mut slot, "1.20.1", hashes(&[("en_US.lang", "aa")]), None));
        assert_eq!(slot, before);
        assert!(Ledger::record(&mut slot, "1.20.1", hashes(&[("en_US.lang", "bb")]), None));
    }

    #[test]
    fn save_and_load_preserve_other_editions() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::default();
        Ledger::record(&mut ledger.java, "24w14a", hashes(&[("en_us.json", "01")]), None);
        ledger.save(dir.path()).unwrap();

        let mut loaded = Ledger::load(dir.path());
        assert_eq!(loaded.java.as_ref().unwrap().version, "24w14a");
        Ledger::record(&mut loaded.bedrock, "1.21.0.3", FileHashes::new(), None);
        loaded.save(dir.path()).unwrap();

        let reloaded = Ledger::load(dir.path());
        assert!(reloaded.java.is_some());
        assert_eq!(reloaded.bedrock.unwrap().version, "1.21.0.3");
        assert!(!dir.path().join("versions.json.tmp").exists());
    }

    #[test]
    fn corrupt_ledger_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), b"{not json").unwrap();
        assert_eq!(Ledger::load(dir.path()), Ledger::default());
    }
}
