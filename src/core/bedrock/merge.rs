// ─── Merged Snapshots ───
// Collapses the per-pack language files of one extracted version into a
// single file per locale. Locales a version lacks are carried forward from
// the nearest older snapshot so every snapshot is complete on its own.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::error::{SyncError, SyncResult};
use crate::core::staging::{read_file, subdirectories, write_file, StagingDir};
use crate::core::version::{compare_versions, sort_versions};

/// Pack precedence; earlier packs win on duplicate keys. A trailing `*`
/// matches any pack with that prefix.
pub const MERGE_ORDER: &[&str] = &[
    "beta",
    "chemistry",
    "editor",
    "education",
    "education_*",
    "experimental_*",
    "oreui",
    "persona",
    "previewapp",
    "vanilla",
    "vanilla_*",
];

/// Order pack directory names for merging. Packs not named in
/// [`MERGE_ORDER`] follow in name order.
pub fn order_packs(mut packs: Vec<String>) -> Vec<String> {
    packs.sort();
    let mut ordered: Vec<String> = Vec::with_capacity(packs.len());

    for pattern in MERGE_ORDER {
        let matches: Vec<&String> = match pattern.strip_suffix('*') {
            Some(prefix) => packs.iter().filter(|p| p.starts_with(prefix)).collect(),
            None => packs.iter().filter(|p| p.as_str() == *pattern).collect(),
        };
        for pack in matches {
            if !ordered.contains(pack) {
                ordered.push(pack.clone());
            }
        }
    }
    for pack in packs {
        if !ordered.contains(&pack) {
            ordered.push(pack);
        }
    }
    ordered
}

/// Outcome of merging one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub version: String,
    /// Locales built from this version's packs.
    pub merged: Vec<String>,
    /// Locales copied from an older snapshot, with the version they came from.
    pub carried: Vec<(String, String)>,
}

/// A merged snapshot waiting to replace `merged/<version>`.
pub struct StagedMerge {
    pub staging: StagingDir,
    pub report: MergeReport,
}

impl StagedMerge {
    pub fn promote(self) -> SyncResult<MergeReport> {
        self.staging.promote()?;
        Ok(self.report)
    }
}

pub struct Merger {
    extracted_dir: PathBuf,
    merged_dir: PathBuf,
}

impl Merger {
    pub fn new(extracted_dir: PathBuf, merged_dir: PathBuf) -> Self {
        Self {
            extracted_dir,
            merged_dir,
        }
    }

    /// Rebuild `merged/<version>` from `extracted/<version>`.
    pub fn merge(&self, version: &str) -> SyncResult<MergeReport> {
        let source = self.extracted_dir.join(version);
        if !source.is_dir() {
            return Err(SyncError::NotFound(format!(
                "no extracted files for Bedrock {version} at {source:?}"
            )));
        }
        self.stage(version, &source)?.promote()
    }

    /// Merge the pack directories under `source` into a staged snapshot for
    /// `version`. `source` may itself still be staged.
    pub fn stage(&self, version: &str, source: &Path) -> SyncResult<StagedMerge> {
        let packs = order_packs(subdirectories(source)?);
        debug!("Merge order for {}: {:?}", version, packs);

        let mut locales: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        for pack in &packs {
            for (locale, entries) in read_pack(&source.join(pack))? {
                let merged = locales.entry(locale).or_default();
                for (key, value) in entries {
                    merged.entry(key).or_insert(value);
                }
            }
        }

        let target = self.merged_dir.join(version);
        let staging = StagingDir::for_target(&target)?;
        let mut report = MergeReport {
            version: version.to_string(),
            ..Default::default()
        };

        for (locale, entries) in &locales {
            let json = serde_json::to_vec_pretty(entries)?;
            write_file(&staging.path().join(locale), &json)?;
            debug!("{}: {} keys", locale, entries.len());
            report.merged.push(locale.clone());
        }

        let present: BTreeSet<String> = locales.into_keys().collect();
        for (locale, from) in self.carry_forward(version, &present, staging.path())? {
            report.carried.push((locale, from));
        }

        if report.merged.is_empty() && report.carried.is_empty() {
            return Err(SyncError::Extraction(format!(
                "Bedrock {version} has no language files to merge"
            )));
        }

        info!(
            "Merged Bedrock {}: {} locales, {} carried forward",
            version,
            report.merged.len(),
            report.carried.len()
        );
        Ok(StagedMerge { staging, report })
    }

    /// Copy locales missing from `version` out of older snapshots, nearest
    /// first.
    fn carry_forward(
        &self,
        version: &str,
        present: &BTreeSet<String>,
        staging: &Path,
    ) -> SyncResult<Vec<(String, String)>> {
        let mut older: Vec<String> = subdirectories(&self.merged_dir)?
            .into_iter()
            .filter(|v| compare_versions(v, version).is_lt())
            .collect();
        sort_versions(&mut older);

        let mut seen = present.clone();
        let mut carried = Vec::new();
        for snapshot in older.iter().rev() {
            let dir = self.merged_dir.join(snapshot);
            for locale in json_files(&dir)? {
                if seen.contains(&locale) {
                    continue;
                }
                let bytes = read_file(&dir.join(&locale))?;
                write_file(&staging.join(&locale), &bytes)?;
                debug!("Carried {} forward from {}", locale, snapshot);
                seen.insert(locale.clone());
                carried.push((locale, snapshot.clone()));
            }
        }
        carried.sort();
        Ok(carried)
    }
}

/// `<locale>.json` → parsed entries for every JSON file directly in `dir`.
fn read_pack(dir: &Path) -> SyncResult<Vec<(String, Map<String, Value>)>> {
    let mut out = Vec::new();
    for name in json_files(dir)? {
        let path = dir.join(&name);
        match serde_json::from_slice::<Map<String, Value>>(&read_file(&path)?) {
            Ok(entries) => out.push((name, entries)),
            Err(e) => warn!("Skipping unreadable {:?}: {}", path, e),
        }
    }
    Ok(out)
}

fn json_files(dir: &Path) -> SyncResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn write_json(path: &Path, value: serde_json::Value) {
        write_file(path, &serde_json::to_vec_pretty(&value).unwrap()).unwrap();
    }

    #[test]
    fn packs_follow_priority_then_name() {
        let ordered = order_packs(strings(&[
            "vanilla_1.20.50",
            "zzz",
            "vanilla",
            "old",
            "experimental_armadillo",
            "beta",
            "education_demo",
            "vanilla_1.19.60",
        ]));
        assert_eq!(
            ordered,
            strings(&[
                "beta",
                "education_demo",
                "experimental_armadillo",
                "vanilla",
                "vanilla_1.19.60",
                "vanilla_1.20.50",
                "old",
                "zzz",
            ])
        );
    }

    #[test]
    fn first_pack_wins_and_keys_are_sorted() {
        let root = tempfile::tempdir().unwrap();
        let extracted = root.path().join("extracted");
        write_json(
            &extracted.join("1.20.1/vanilla/en_US.json"),
            serde_json::json!({"z.key": "vanilla", "shared": "vanilla"}),
        );
        write_json(
            &extracted.join("1.20.1/beta/en_US.json"),
            serde_json::json!({"shared": "beta", "a.key": "beta"}),
        );
        write_json(
            &extracted.join("1.20.1/old/de_DE.json"),
            serde_json::json!({"only": "old"}),
        );
        let merger = Merger::new(extracted, root.path().join("merged"));

        let report = merger.merge("1.20.1").unwrap();
        assert_eq!(report.merged, strings(&["de_DE.json", "en_US.json"]));

        let raw = std::fs::read_to_string(root.path().join("merged/1.20.1/en_US.json")).unwrap();
        assert_eq!(
            raw,
            "{\n  \"a.key\": \"beta\",\n  \"shared\": \"beta\",\n  \"z.key\": \"vanilla\"\n}"
        );
    }

    #[test]
    fn missing_locale_is_carried_from_nearest_older_snapshot() {
        let root = tempfile::tempdir().unwrap();
        let extracted = root.path().join("extracted");
        let merged = root.path().join("merged");
        write_json(&extracted.join("1.20.1/vanilla/en_US.json"), serde_json::json!({"a": "1"}));
        write_file(&merged.join("1.19.80/ja_JP.json"), b"{\"old\": \"1.19.80\"}").unwrap();
        write_file(&merged.join("1.20.0/ja_JP.json"), b"{\"old\": \"1.20.0\"}").unwrap();
        write_file(&merged.join("1.20.0/ko_KR.json"), b"{\"k\": \"1.20.0\"}").unwrap();
        write_file(&merged.join("1.20.0/en_US.json"), b"{\"a\": \"stale\"}").unwrap();
        write_file(&merged.join("1.21.0/fr_FR.json"), b"{\"newer\": true}").unwrap();

        let report = Merger::new(extracted, merged.clone()).merge("1.20.1").unwrap();

        assert_eq!(
            report.carried,
            vec![
                ("ja_JP.json".to_string(), "1.20.0".to_string()),
                ("ko_KR.json".to_string(), "1.20.0".to_string()),
            ]
        );
        assert_eq!(
            std::fs::read(merged.join("1.20.1/ja_JP.json")).unwrap(),
            std::fs::read(merged.join("1.20.0/ja_JP.json")).unwrap()
        );
        assert!(!merged.join("1.20.1/fr_FR.json").exists());
        let en = std::fs::read_to_string(merged.join("1.20.1/en_US.json")).unwrap();
        assert!(en.contains("\"1\""));
    }

    #[test]
    fn staged_merge_is_invisible_until_promoted() {
        let root = tempfile::tempdir().unwrap();
        let staged_source = root.path().join("work");
        write_json(&staged_source.join("vanilla/en_US.json"), serde_json::json!({"a": "1"}));
        let merged = root.path().join("merged");
        let merger = Merger::new(root.path().join("extracted"), merged.clone());

        let staged = merger.stage("1.20.1", &staged_source).unwrap();
        assert!(!merged.join("1.20.1").exists());
        let report = staged.promote().unwrap();

        assert_eq!(report.merged, strings(&["en_US.json"]));
        assert!(merged.join("1.20.1/en_US.json").is_file());
    }

    #[test]
    fn unknown_version_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let merger = Merger::new(root.path().join("extracted"), root.path().join("merged"));
        assert!(matches!(merger.merge("9.9.9"), Err(SyncError::NotFound(_))));
        assert!(!root.path().join("merged/9.9.9").exists());
    }
}
