// ─── Bedrock Catalog ───
// Parses the mcappx.com version catalog: one entry per Bedrock build with its
// package type, build format and per-architecture download metadata.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::core::credentials::Channel;
use crate::core::error::{SyncError, SyncResult};
use crate::core::version::{compare_versions, Target};

pub const CATALOG_URL: &str = "https://data.mcappx.com/v2/bedrock.json";
const CATALOG_KEY: &str = "From_mcappx.com";
const ARCH: &str = "x64";
/// Variations below this status have no downloadable archive.
const MIN_ARCHIVAL_STATUS: i64 = 2;

/// Package container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BuildType {
    /// Store `.appx` package, a plain zip.
    #[serde(rename = "UWP")]
    Uwp,
    /// Encrypted `.msixvc` streaming package.
    #[serde(rename = "GDK")]
    Gdk,
    #[serde(other)]
    Unknown,
}

impl BuildType {
    pub fn extension(self) -> &'static str {
        match self {
            BuildType::Uwp => "appx",
            BuildType::Gdk => "msixvc",
            BuildType::Unknown => "bin",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Variation {
    pub arch: String,
    #[serde(default)]
    pub archival_status: i64,
    #[serde(default)]
    pub meta_data: Vec<Value>,
}

impl Variation {
    /// UWP: the store update id. GDK: the direct package URL.
    pub fn download_hint(&self) -> Option<String> {
        self.meta_data
            .iter()
            .find_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn is_archived(&self) -> bool {
        self.archival_status >= MIN_ARCHIVAL_STATUS
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEntry {
    #[serde(default)]
    date: String,
    build_type: BuildType,
    #[serde(rename = "Type", default)]
    package_type: String,
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(default)]
    variations: Vec<Variation>,
}

/// One Bedrock build as listed by the catalog.
#[derive(Debug, Clone)]
pub struct BedrockRelease {
    pub version: String,
    pub date: String,
    pub build_type: BuildType,
    /// `Release`, `Beta` or `Preview`.
    pub package_type: String,
    /// Mirror id, e.g. `1.21.50.7`.
    pub id: String,
    pub x64: Option<Variation>,
}

impl BedrockRelease {
    pub fn channel(&self) -> Channel {
        Channel::from_package_type(&self.package_type)
    }

    pub fn is_downloadable(&self) -> bool {
        self.x64.as_ref().is_some_and(Variation::is_archived)
    }

    pub fn package_file_name(&self) -> String {
        format!(
            "Bedrock_Edition_{}.{}",
            self.version,
            self.build_type.extension()
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct BedrockCatalog {
    releases: Vec<BedrockRelease>,
}

impl BedrockCatalog {
    pub fn parse(bytes: &[u8]) -> SyncResult<Self> {
        let mut root: BTreeMap<String, Value> = serde_json::from_slice(bytes)?;
        let entries = root.remove(CATALOG_KEY).ok_or_else(|| {
            SyncError::NotFound(format!("catalog has no \"{CATALOG_KEY}\" section"))
        })?;
        let entries: BTreeMap<String, RawEntry> = serde_json::from_value(entries)?;
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: BTreeMap<String, RawEntry>) -> Self {
        let mut releases: Vec<BedrockRelease> = entries
            .into_iter()
            .map(|(version, raw)| BedrockRelease {
                x64: raw.variations.into_iter().find(|v| v.arch == ARCH),
                version,
                date: raw.date,
                build_type: raw.build_type,
                package_type: raw.package_type,
                id: raw.id,
            })
            .collect();
        releases.sort_by(|a, b| compare_versions(&a.version, &b.version));
        Self { releases }
    }

    pub fn from_releases(mut releases: Vec<BedrockRelease>) -> Self {
        releases.sort_by(|a, b| compare_versions(&a.version, &b.version));
        Self { releases }
    }

    pub fn releases(&self) -> &[BedrockRelease] {
        &self.releases
    }

    pub fn get(&self, version: &str) -> Option<&BedrockRelease> {
        self.releases.iter().find(|r| r.version == version)
    }

    /// Newest entry by catalog date, ties broken by version.
    pub fn latest(&self) -> Option<&BedrockRelease> {
        self.releases.iter().max_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| compare_versions(&a.version, &b.version))
        })
    }

    /// Resolve a target to a downloadable release.
    pub fn resolve(&self, target: &Target) -> SyncResult<&BedrockRelease> {
        let release = match target {
            Target::Latest => self
                .latest()
                .ok_or_else(|| SyncError::NotFound("catalog is empty".into()))?,
            Target::Version(version) => self.get(version).ok_or_else(|| {
                SyncError::NotFound(format!("Bedrock {version} is not in the catalog"))
            })?,
        };

        match &release.x64 {
            None => Err(SyncError::NotFound(format!(
                "Bedrock {} has no {ARCH} package",
                release.version
            ))),
            Some(v) if !v.is_archived() => Err(SyncError::NotFound(format!(
                "Bedrock {} {ARCH} package is not archived (status {})",
                release.version, v.archival_status
            ))),
            Some(_) => Ok(release),
        }
    }

    /// Versions with a downloadable x64 package, oldest first.
    pub fn downloadable_versions(&self) -> Vec<String> {
        self.releases
            .iter()
            .filter(|r| r.is_downloadable())
            .map(|r| r.version.clone())
            .collect()
    }
}
