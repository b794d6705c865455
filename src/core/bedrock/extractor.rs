// ─── Package Extraction ───
// GDK packages are encrypted streaming containers that only XvdTool.Streaming
// can open; UWP packages are plain zips read in-process. Either way the output
// mirrors the package's internal paths under `output_dir`.

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::catalog::BuildType;
use super::fetcher::FetchedPackage;
use super::organizer::{is_language_resource, virtual_path};
use crate::core::error::{SyncError, SyncResult};
use crate::core::staging::{capacity_hint, create_dir_all, write_file};

const NESTED_PACK_ROOT: &str = "data/resource_packs/";

/// Everything an extractor needs for one package.
pub struct ExtractContext<'a> {
    pub package: &'a FetchedPackage,
    /// Scratch directory for tool state; also the tool's working directory.
    pub workspace: &'a Path,
    pub output_dir: &'a Path,
}

#[async_trait]
pub trait PackageExtractor: Send + Sync {
    /// Unpack the package into `ctx.output_dir`, returning the relative path
    /// of every file written.
    async fn extract(&self, ctx: ExtractContext<'_>) -> SyncResult<Vec<PathBuf>>;
}

/// Dispatches on the package build type.
pub struct BuildTypeExtractor {
    xvd: XvdToolExtractor,
    appx: AppxExtractor,
}

impl BuildTypeExtractor {
    pub fn new(xvdtool: PathBuf) -> Self {
        Self {
            xvd: XvdToolExtractor::new(xvdtool),
            appx: AppxExtractor,
        }
    }
}

#[async_trait]
impl PackageExtractor for BuildTypeExtractor {
    async fn extract(&self, ctx: ExtractContext<'_>) -> SyncResult<Vec<PathBuf>> {
        match ctx.package.build_type {
            BuildType::Gdk => self.xvd.extract(ctx).await,
            BuildType::Uwp => self.appx.extract(ctx).await,
            BuildType::Unknown => Err(SyncError::Extraction(format!(
                "no extractor for {:?}",
                ctx.package.path
            ))),
        }
    }
}

// ── XvdTool.Streaming ───────────────────────────────

pub struct XvdToolExtractor {
    tool: PathBuf,
}

impl XvdToolExtractor {
    pub fn new(tool: PathBuf) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl PackageExtractor for XvdToolExtractor {
    async fn extract(&self, ctx: ExtractContext<'_>) -> SyncResult<Vec<PathBuf>> {
        if !self.tool.is_file() {
            return Err(SyncError::Configuration(format!(
                "XvdTool.Streaming not found at {:?}",
                self.tool
            )));
        }
        let key = ctx.package.key.as_ref().ok_or_else(|| {
            SyncError::Auth(format!(
                "no {} key to decrypt {:?}",
                ctx.package.channel, ctx.package.path
            ))
        })?;

        let cik_path = key.write_to(&ctx.workspace.join("Cik"))?;
        debug!("Wrote content key to {:?}", cik_path);
        create_dir_all(ctx.output_dir)?;

        info!("Extracting {:?} with XvdTool.Streaming", ctx.package.path);
        let output = Command::new(&self.tool)
            .arg("extract")
            .arg(&ctx.package.path)
            .arg("-o")
            .arg(ctx.output_dir)
            .current_dir(ctx.workspace)
            .output()
            .map_err(|e| SyncError::io(&self.tool, e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("XvdTool: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!("XvdTool: {}", line);
        }
        if !output.status.success() {
            return Err(SyncError::Extraction(format!(
                "XvdTool.Streaming exited with {}",
                output.status
            )));
        }

        let files = list_files(ctx.output_dir)?;
        require_language_files(&files, &ctx.package.path)?;
        Ok(files)
    }
}

/// Relative paths of all regular files below `root`, sorted.
pub fn list_files(root: &Path) -> SyncResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn require_language_files(files: &[PathBuf], package: &Path) -> SyncResult<()> {
    let found = files
        .iter()
        .filter(|f| is_language_resource(&virtual_path(f)))
        .count();
    if found == 0 {
        return Err(SyncError::Extraction(format!(
            "{:?} yielded no language files",
            package
        )));
    }
    info!("{} language files extracted from {:?}", found, package);
    Ok(())
}

// ── Appx (zip) ──────────────────────────────────────

/// Reads language files straight out of a UWP `.appx`, including the ones
/// inside nested resource pack zips.
pub struct AppxExtractor;

#[async_trait]
impl PackageExtractor for AppxExtractor {
    async fn extract(&self, ctx: ExtractContext<'_>) -> SyncResult<Vec<PathBuf>> {
        let files = extract_appx(&ctx.package.path, ctx.output_dir)?;
        require_language_files(&files, &ctx.package.path)?;
        Ok(files)
    }
}

pub fn extract_appx(archive_path: &Path, output_dir: &Path) -> SyncResult<Vec<PathBuf>> {
    let file = std::fs::File::open(archive_path).map_err(|e| SyncError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut written = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if is_language_resource(&name) {
            let mut bytes = Vec::with_capacity(capacity_hint(entry.size()));
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| SyncError::io(archive_path, e))?;
            written.push(write_entry(output_dir, &name, &bytes)?);
            continue;
        }

        let Some(pack) = nested_pack_name(&name) else {
            continue;
        };
        debug!("Reading nested pack {}", name);
        let mut inner_bytes = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut inner_bytes)
            .map_err(|e| SyncError::io(archive_path, e))?;
        let mut inner = zip::ZipArchive::new(Cursor::new(inner_bytes))?;

        for inner_index in 0..inner.len() {
            let mut inner_entry = inner.by_index(inner_index)?;
            if inner_entry.is_dir() {
                continue;
            }
            let inner_name = inner_entry.name().to_string();
            let rest = inner_name.strip_prefix("texts/").unwrap_or(&inner_name);
            let virtual_name = format!("{NESTED_PACK_ROOT}{pack}/texts/{rest}");
            if !is_language_resource(&virtual_name) {
                continue;
            }
            let mut bytes = Vec::with_capacity(capacity_hint(inner_entry.size()));
            inner_entry
                .read_to_end(&mut bytes)
                .map_err(|e| SyncError::io(archive_path, e))?;
            written.push(write_entry(output_dir, &virtual_name, &bytes)?);
        }
    }

    written.sort();
    Ok(written)
}

/// `data/resource_packs/<pack>.zip` → `<pack>`.
fn nested_pack_name(name: &str) -> Option<&str> {
    let lower = name.to_ascii_lowercase();
    if !lower.starts_with(NESTED_PACK_ROOT) || !lower.ends_with(".zip") {
        return None;
    }
    let pack = &name[NESTED_PACK_ROOT.len()..name.len() - ".zip".len()];
    (!pack.is_empty()).then_some(pack)
}

/// Write a zip entry below `root`, refusing names that escape it.
fn write_entry(root: &Path, name: &str, bytes: &[u8]) -> SyncResult<PathBuf> {
    let mut rel = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => {
                return Err(SyncError::Extraction(format!(
                    "refusing unsafe archive path {name:?}"
                )))
            }
        }
    }
    write_file(&root.join(&rel), bytes)?;
    Ok(rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::Channel;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn package(path: PathBuf, build_type: BuildType) -> FetchedPackage {
        FetchedPackage {
            version: "1.2.13.60".into(),
            build_type,
            channel: Channel::Release,
            path,
            key: None,
        }
    }

    #[test]
    fn appx_entries_and_nested_packs_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = zip_bytes(&[
            ("texts/en_US.lang", b"pack.name=Edu"),
            ("manifest.json", b"{}"),
        ]);
        let appx = zip_bytes(&[
            ("data/resource_packs/vanilla/texts/en_US.lang", b"a=1\n"),
            ("data/resource_packs/vanilla/textures/x.png", b"png"),
            ("data/lang/en_US.lang", b"old=1"),
            ("data/loc/pc-base/en_US.lang", b"skip=1"),
            ("data/resource_packs/education.zip", &nested),
        ]);
        let archive = dir.path().join("Bedrock_Edition_1.2.13.60.appx");
        std::fs::write(&archive, appx).unwrap();
        let out = dir.path().join("out");

        let files = extract_appx(&archive, &out).unwrap();
        let names: Vec<String> = files.iter().map(|f| virtual_path(f)).collect();
        assert_eq!(
            names,
            vec![
                "data/lang/en_US.lang",
                "data/resource_packs/education/texts/en_US.lang",
                "data/resource_packs/vanilla/texts/en_US.lang",
            ]
        );
        assert_eq!(
            std::fs::read(out.join("data/resource_packs/vanilla/texts/en_US.lang")).unwrap(),
            b"a=1\n"
        );
    }

    #[tokio::test]
    async fn appx_without_language_files_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.appx");
        std::fs::write(&archive, zip_bytes(&[("AppxManifest.xml", b"<x/>")])).unwrap();
        let package = package(archive, BuildType::Uwp);
        let out = dir.path().join("out");

        let result = AppxExtractor
            .extract(ExtractContext {
                package: &package,
                workspace: dir.path(),
                output_dir: &out,
            })
            .await;
        assert!(matches!(result, Err(SyncError::Extraction(_))));
    }

    #[tokio::test]
    async fn missing_xvdtool_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let package = package(dir.path().join("pkg.msixvc"), BuildType::Gdk);
        let extractor = BuildTypeExtractor::new(dir.path().join("missing/XvdTool.Streaming"));

        let result = extractor
            .extract(ExtractContext {
                package: &package,
                workspace: dir.path(),
                output_dir: &dir.path().join("out"),
            })
            .await;
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn unsafe_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_entry(dir.path(), "../escape.lang", b"").is_err());
        assert_eq!(nested_pack_name("data/resource_packs/chemistry.zip"), Some("chemistry"));
        assert_eq!(nested_pack_name("data/behavior_packs/chemistry.zip"), None);
    }
}
