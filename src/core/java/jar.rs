// ─── Client Jar ───
// Older clients ship every locale inside the jar; newer ones only ship the
// English source file and leave the rest to the asset index.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::core::error::{SyncError, SyncResult};
use crate::core::lang::LocaleFilter;
use crate::core::staging::capacity_hint;

/// Source-language locations across client generations.
pub const SOURCE_ENTRIES: [&str; 3] = [
    "assets/minecraft/lang/en_US.lang",
    "assets/minecraft/lang/en_us.json",
    "assets/minecraft/lang/en_us.lang",
];

/// Exported regardless of the locale filter.
pub const STATS_ENTRY: &str = "lang/stats_US.lang";

#[derive(Debug, Clone)]
pub struct JarLangFile {
    pub entry: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl JarLangFile {
    pub fn is_stats(&self) -> bool {
        self.entry == STATS_ENTRY
    }
}

/// Read the language files a client jar carries, in jar order after the
/// fixed source entries.
pub fn read_lang_files(jar_path: &Path, languages: &LocaleFilter) -> SyncResult<Vec<JarLangFile>> {
    let file = std::fs::File::open(jar_path).map_err(|e| SyncError::io(jar_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut candidates: Vec<String> = SOURCE_ENTRIES.iter().map(|s| s.to_string()).collect();
    candidates.extend(
        archive
            .file_names()
            .filter(|name| name.starts_with("lang/") && name.ends_with(".lang"))
            .map(str::to_string),
    );

    let mut files = Vec::new();
    for entry in candidates {
        let file_name = entry.rsplit('/').next().unwrap_or(&entry).to_string();
        if entry != STATS_ENTRY && !languages.allows(&file_name) {
            continue;
        }
        let mut zipped = match archive.by_name(&entry) {
            Ok(zipped) => zipped,
            Err(zip::result::ZipError::FileNotFound) => continue,
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(capacity_hint(zipped.size()));
        zipped
            .read_to_end(&mut bytes)
            .map_err(|e| SyncError::io(jar_path, e))?;
        debug!("Taking {} from client jar", entry);
        files.push(JarLangFile {
            entry,
            file_name,
            bytes,
        });
    }
    Ok(files)
}

/// The source-language file name, used to avoid fetching it again from the
/// asset index.
pub fn source_file_name(files: &[JarLangFile]) -> Option<&str> {
    files
        .iter()
        .rev()
        .find(|f| !f.is_stats())
        .map(|f| f.file_name.as_str())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    pub(crate) fn jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn legacy_jar_carries_all_locales() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Java_Edition_1.5.2.jar");
        std::fs::write(
            &path,
            jar(&[
                ("net/minecraft/client/Minecraft.class", b"\xca\xfe"),
                ("lang/en_US.lang", b"gui.done=Done"),
                ("lang/de_DE.lang", b"gui.done=Fertig"),
                ("lang/stats_US.lang", b"stat.x=X"),
            ]),
        )
        .unwrap();

        let all = read_lang_files(&path, &LocaleFilter::all()).unwrap();
        let names: Vec<&str> = all.iter().map(|f| f.entry.as_str()).collect();
        assert_eq!(names, vec!["lang/en_US.lang", "lang/de_DE.lang", "lang/stats_US.lang"]);
        assert_eq!(source_file_name(&all), Some("de_DE.lang"));

        let filtered = read_lang_files(&path, &LocaleFilter::parse("en-US")).unwrap();
        let names: Vec<&str> = filtered.iter().map(|f| f.entry.as_str()).collect();
        assert_eq!(names, vec!["lang/en_US.lang", "lang/stats_US.lang"]);
    }

    #[test]
    fn modern_jar_has_only_the_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Java_Edition_1.20.4.jar");
        std::fs::write(&path, jar(&[("assets/minecraft/lang/en_us.json", b"{}")])).unwrap();

        let files = read_lang_files(&path, &LocaleFilter::all()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(source_file_name(&files), Some("en_us.json"));
    }
}
