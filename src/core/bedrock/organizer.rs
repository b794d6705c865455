// ─── File Organizer ───
// Maps extractor output (package-internal virtual paths) onto the tracked
// `bedrock/extracted/<version>/<pack>/<file>` layout.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::{SyncError, SyncResult};
use crate::core::lang::{write_json_sibling, LocaleFilter};
use crate::core::ledger::{sha1_hex, FileHashes};
use crate::core::staging::{read_file, write_file, StagingDir};

/// Pack directory for the legacy top-level `data/lang` and `data/loc` files.
pub const LEGACY_PACK: &str = "old";

const PACK_ROOTS: [&str; 2] = ["resource_packs", "resourcepacks"];
const LEGACY_ROOTS: [&str; 2] = ["lang", "loc"];

/// Join path components with `/` regardless of platform.
pub fn virtual_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Where a package file belongs under the version directory, if anywhere.
///
/// `data/resource_packs/<pack>/[client/]texts/<file>.lang` → `<pack>/<file>.lang`,
/// `data/lang/<rest>.lang` and `data/loc/<rest>.lang` → `old/<rest>.lang`.
/// The leading `data` component is matched case-insensitively.
pub fn destination_for(virtual_path: &str) -> Option<String> {
    let normalized = virtual_path.replace('\\', "/");
    if !normalized.to_ascii_lowercase().ends_with(".lang") {
        return None;
    }
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    let (first, rest) = parts.split_first()?;
    if !first.eq_ignore_ascii_case("data") {
        return None;
    }
    let (root, rest) = rest.split_first()?;

    if PACK_ROOTS.iter().any(|r| root.eq_ignore_ascii_case(r)) {
        let (pack, inner) = rest.split_first()?;
        if !inner.iter().any(|p| p.eq_ignore_ascii_case("texts")) {
            return None;
        }
        let kept: Vec<&str> = inner
            .iter()
            .copied()
            .filter(|p| !p.eq_ignore_ascii_case("texts") && !p.eq_ignore_ascii_case("client"))
            .collect();
        if kept.is_empty() {
            return None;
        }
        return Some(format!("{pack}/{}", kept.join("/")));
    }

    if LEGACY_ROOTS.iter().any(|r| root.eq_ignore_ascii_case(r)) {
        if rest.is_empty() || rest.iter().any(|p| p.eq_ignore_ascii_case("pc-base")) {
            return None;
        }
        return Some(format!("{LEGACY_PACK}/{}", rest.join("/")));
    }

    None
}

pub fn is_language_resource(virtual_path: &str) -> bool {
    destination_for(virtual_path).is_some()
}

/// One version's organised files, still staged next to their target.
pub struct OrganizedTree {
    pub staging: StagingDir,
    /// Destination path → SHA-1 of the `.lang` bytes.
    pub files: FileHashes,
}

impl OrganizedTree {
    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Replace the target with the staged tree.
    pub fn promote(self) -> SyncResult<PathBuf> {
        self.staging.promote()
    }
}

/// Copy recognised language files from `source_root` into a staging
/// directory for `target`. Each `.lang` gets a `.json` sibling. Nothing
/// reaches `target` until the returned tree is promoted.
pub fn organize(
    source_root: &Path,
    files: &[PathBuf],
    target: &Path,
    languages: &LocaleFilter,
) -> SyncResult<OrganizedTree> {
    let staging = StagingDir::for_target(target)?;

    let mut mapped: Vec<(String, &PathBuf)> = files
        .iter()
        .filter_map(|rel| destination_for(&virtual_path(rel)).map(|dest| (dest, rel)))
        .collect();
    mapped.sort();

    let mut hashes = FileHashes::new();
    for (dest, rel) in mapped {
        let file_name = dest.rsplit('/').next().unwrap_or(&dest);
        if !languages.allows(file_name) {
            debug!("Skipping {} (not exported)", dest);
            continue;
        }
        if hashes.contains_key(&dest) {
            warn!("{} maps onto already organised {}, keeping the first", rel.display(), dest);
            continue;
        }

        let bytes = read_file(&source_root.join(rel))?;
        let out = staging.path().join(&dest);
        write_file(&out, &bytes)?;
        write_json_sibling(&out, &bytes)?;
        hashes.insert(dest, sha1_hex(&bytes));
    }

    if hashes.is_empty() {
        return Err(SyncError::Extraction(format!(
            "no language files found for {:?}",
            target
        )));
    }

    info!("Organised {} language files for {:?}", hashes.len(), target);
    Ok(OrganizedTree {
        staging,
        files: hashes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_pack_texts_are_flattened() {
        assert_eq!(
            destination_for("data/resource_packs/vanilla/texts/en_US.lang").as_deref(),
            Some("vanilla/en_US.lang")
        );
        assert_eq!(
            destination_for("Data/resource_packs/vanilla_1.20.50/client/texts/zh_CN.lang").as_deref(),
            Some("vanilla_1.20.50/zh_CN.lang")
        );
        assert_eq!(
            destination_for("DATA\\resourcepacks\\education\\texts\\de_DE.lang").as_deref(),
            Some("education/de_DE.lang")
        );
    }

    #[test]
    fn legacy_locations_go_to_old() {
        assert_eq!(
            destination_for("data/lang/en_US.lang").as_deref(),
            Some("old/en_US.lang")
        );
        assert_eq!(
            destination_for("data/loc/fr_FR/strings.lang").as_deref(),
            Some("old/fr_FR/strings.lang")
        );
        assert_eq!(destination_for("data/loc/pc-base/en_US.lang"), None);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        assert_eq!(destination_for("data/resource_packs/vanilla/manifest.json"), None);
        assert_eq!(destination_for("data/resource_packs/vanilla/en_US.lang"), None);
        assert_eq!(destination_for("assets/lang/en_US.lang"), None);
        assert_eq!(destination_for("data/other/texts/en_US.lang"), None);
    }

    fn source_tree(root: &Path) -> Vec<PathBuf> {
        let files = [
            ("data/resource_packs/vanilla/texts/en_US.lang", "a=1\r\nb=2\t#c\n".as_bytes()),
            ("data/resource_packs/vanilla/texts/zh_CN.lang", "\u{feff}a=一\n".as_bytes()),
            ("data/resource_packs/vanilla/texts/languages.json", b"[]".as_slice()),
        ];
        files
            .iter()
            .map(|(rel, bytes)| {
                write_file(&root.join(rel), bytes).unwrap();
                PathBuf::from(rel)
            })
            .collect()
    }

    #[test]
    fn organised_files_are_byte_identical() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = source_tree(work.path());
        let target = out.path().join("1.20.1");

        let tree = organize(work.path(), &files, &target, &LocaleFilter::all()).unwrap();
        assert!(!target.exists());
        assert_eq!(tree.files.len(), 2);
        tree.promote().unwrap();

        for (rel, dest) in [
            ("data/resource_packs/vanilla/texts/en_US.lang", "vanilla/en_US.lang"),
            ("data/resource_packs/vanilla/texts/zh_CN.lang", "vanilla/zh_CN.lang"),
        ] {
            assert_eq!(
                std::fs::read(work.path().join(rel)).unwrap(),
                std::fs::read(target.join(dest)).unwrap()
            );
        }
        assert!(target.join("vanilla/en_US.json").exists());
        assert!(!target.join("vanilla/languages.json").exists());
    }

    #[test]
    fn organising_twice_yields_the_same_tree() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = source_tree(work.path());
        let target = out.path().join("1.20.1");

        let first = organize(work.path(), &files, &target, &LocaleFilter::all()).unwrap();
        let first_files = first.files.clone();
        first.promote().unwrap();
        let snapshot = |dir: &Path| -> Vec<(String, Vec<u8>)> {
            let mut entries: Vec<_> = walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| {
                    (
                        virtual_path(e.path().strip_prefix(dir).unwrap()),
                        std::fs::read(e.path()).unwrap(),
                    )
                })
                .collect();
            entries.sort();
            entries
        };
        let before = snapshot(&target);

        let second = organize(work.path(), &files, &target, &LocaleFilter::all()).unwrap();
        assert_eq!(first_files, second.files);
        second.promote().unwrap();
        assert_eq!(before, snapshot(&target));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }

    #[test]
    fn unpromoted_tree_leaves_nothing_behind() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = source_tree(work.path());
        let target = out.path().join("1.20.1");

        let tree = organize(work.path(), &files, &target, &LocaleFilter::all()).unwrap();
        assert!(tree.path().join("vanilla/en_US.lang").is_file());
        drop(tree);

        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn export_filter_limits_locales() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let files = source_tree(work.path());
        let target = out.path().join("1.20.1");

        let tree = organize(work.path(), &files, &target, &LocaleFilter::parse("zh-CN")).unwrap();
        assert_eq!(tree.files.keys().collect::<Vec<_>>(), vec!["vanilla/zh_CN.lang"]);
    }

    #[test]
    fn nothing_recognised_is_an_error_and_leaves_no_target() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_file(&work.path().join("readme.txt"), b"hi").unwrap();
        let target = out.path().join("1.20.1");

        let result = organize(
            work.path(),
            &[PathBuf::from("readme.txt")],
            &target,
            &LocaleFilter::all(),
        );
        assert!(matches!(result, Err(SyncError::Extraction(_))));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
