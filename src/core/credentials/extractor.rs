// ─── CIK Extraction ───
// Drives the external CikExtractor tool on a licensed Windows machine and
// turns its dump into a `CIK_DATA` value for CI secrets.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use super::blob::{ContentKey, ContentKeys};
use crate::core::error::{SyncError, SyncResult};

const RELEASE_FAMILY: &str = "microsoft.minecraftuwp_8wekyb3d8bbwe";
const PREVIEW_FAMILY: &str = "microsoft.minecraftwindowsbeta_8wekyb3d8bbwe";
const GUID_SEARCH_WINDOW: usize = 10;

pub struct CikExtractor {
    tool: PathBuf,
    output_dir: PathBuf,
}

impl CikExtractor {
    pub fn new(tool: PathBuf, output_dir: PathBuf) -> Self {
        Self { tool, output_dir }
    }

    /// Dump keys with the tool and collect the Minecraft ones.
    pub fn run(&self) -> SyncResult<ContentKeys> {
        if !cfg!(target_os = "windows") {
            return Err(SyncError::Configuration(
                "CIK extraction requires Windows; CikExtractor is a Windows-only tool".into(),
            ));
        }
        if !self.tool.exists() {
            return Err(SyncError::Configuration(format!(
                "CikExtractor not found at {:?}; build it from https://github.com/LukeFZ/CikExtractor",
                self.tool
            )));
        }

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| SyncError::io(&self.output_dir, e))?;
        let output_dir = std::fs::canonicalize(&self.output_dir)
            .map_err(|e| SyncError::io(&self.output_dir, e))?;

        info!("Extracting CIK keys into {:?}", output_dir);
        let mut cmd = Command::new(&self.tool);
        cmd.arg("dump").arg("-c").arg(&output_dir);
        if let Some(dir) = self.tool.parent() {
            cmd.current_dir(dir);
        }
        let output = cmd.output().map_err(|e| SyncError::io(&self.tool, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!("CikExtractor: {}", line);
        }
        for line in stderr.lines() {
            warn!("CikExtractor: {}", line);
        }
        if !output.status.success() {
            return Err(SyncError::Extraction(format!(
                "CikExtractor exited with {}",
                output.status
            )));
        }

        let lines: Vec<&str> = stdout.lines().collect();
        let release_guid = find_product_guid(&lines, RELEASE_FAMILY);
        let preview_guid = find_product_guid(&lines, PREVIEW_FAMILY);
        collect_keys(&output_dir, release_guid, preview_guid)
    }
}

/// Find the GUID printed in the tree below a package family line.
pub fn find_product_guid(lines: &[&str], family: &str) -> Option<String> {
    let start = lines
        .iter()
        .position(|line| line.to_ascii_lowercase().contains(family))?;

    lines
        .iter()
        .skip(start + 1)
        .take(GUID_SEARCH_WINDOW - 1)
        .filter(|line| line.contains("└──"))
        .filter_map(|line| line.split_whitespace().last())
        .find(|token| token.contains('-') && token.len() > 30)
        .map(str::to_string)
}

/// Pair the dumped `.cik` files with the product GUIDs.
pub fn collect_keys(
    cik_dir: &Path,
    release_guid: Option<String>,
    preview_guid: Option<String>,
) -> SyncResult<ContentKeys> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(cik_dir).map_err(|e| SyncError::io(cik_dir, e))? {
        let path = entry.map_err(|e| SyncError::io(cik_dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "cik") {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(SyncError::Extraction("no CIK files were extracted".into()));
    }
    info!("{} CIK key(s) extracted", files.len());

    let load = |guid: Option<String>| -> SyncResult<Option<ContentKey>> {
        let Some(guid) = guid else {
            return Ok(None);
        };
        let Some(path) = files.iter().find(|p| {
            p.file_stem()
                .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(&guid))
        }) else {
            return Ok(None);
        };
        let key = std::fs::read(path).map_err(|e| SyncError::io(path, e))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(guid);
        Ok(Some(ContentKey::new(stem, key)))
    };

    let keys = ContentKeys {
        release: load(release_guid)?,
        preview: load(preview_guid)?,
    };
    if keys.release.is_none() && keys.preview.is_none() {
        return Err(SyncError::Extraction(
            "could not identify a Minecraft CIK among the extracted files".into(),
        ));
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
Licenses:
├── Microsoft.MinecraftUWP_8wekyb3d8bbwe
│   └── ?? 5ae9a5d6-1d3c-4b31-9a62-3f5ad7d1a0c1
├── Microsoft.MinecraftWindowsBeta_8wekyb3d8bbwe
│   └── ?? 0c7f8a2e-9d41-4f8e-bb5c-2a1e6e9b7d42
└── Microsoft.SomethingElse_8wekyb3d8bbwe
    └── ?? 11111111-2222-3333-4444-555555555555
";

    #[test]
    fn guids_are_read_from_the_tree_dump() {
        let lines: Vec<&str> = DUMP.lines().collect();
        assert_eq!(
            find_product_guid(&lines, RELEASE_FAMILY).as_deref(),
            Some("5ae9a5d6-1d3c-4b31-9a62-3f5ad7d1a0c1")
        );
        assert_eq!(
            find_product_guid(&lines, PREVIEW_FAMILY).as_deref(),
            Some("0c7f8a2e-9d41-4f8e-bb5c-2a1e6e9b7d42")
        );
        assert_eq!(find_product_guid(&lines, "microsoft.absent_8wekyb3d8bbwe"), None);
    }

    #[test]
    fn keys_are_matched_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("5AE9A5D6-1D3C-4B31-9A62-3F5AD7D1A0C1.cik"), [1, 2]).unwrap();
        std::fs::write(dir.path().join("unrelated.cik"), [9]).unwrap();

        let keys = collect_keys(
            dir.path(),
            Some("5ae9a5d6-1d3c-4b31-9a62-3f5ad7d1a0c1".into()),
            Some("0c7f8a2e-9d41-4f8e-bb5c-2a1e6e9b7d42".into()),
        )
        .unwrap();
        let release = keys.release.unwrap();
        assert_eq!(release.guid, "5AE9A5D6-1D3C-4B31-9A62-3F5AD7D1A0C1");
        assert_eq!(release.bytes(), &[1, 2]);
        assert!(keys.preview.is_none());
    }

    #[test]
    fn no_matching_key_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("unrelated.cik"), [9]).unwrap();
        let result = collect_keys(dir.path(), Some("missing".into()), None);
        assert!(matches!(result, Err(SyncError::Extraction(_))));
    }
}
