use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::http::RetryPolicy;
use crate::core::lang::LocaleFilter;

const APP_DIR_NAME: &str = "mc-lang-sync";
pub const SETTINGS_FILE: &str = "mc-lang-sync.json";

/// Optional per-repository overrides read from `mc-lang-sync.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub retries: Option<u32>,
    pub export_languages: Option<Vec<String>>,
    pub xvdtool_path: Option<PathBuf>,
    pub cik_extractor_path: Option<PathBuf>,
    pub keep_packages: Option<bool>,
}

/// Values supplied on the command line (or their env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub base_dir: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub tools_dir: Option<PathBuf>,
    pub retries: Option<u32>,
    pub keep_packages: bool,
}

/// Resolved configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub tools_dir: PathBuf,
    pub retry: RetryPolicy,
    pub languages: LocaleFilter,
    pub keep_packages: bool,
    xvdtool_path: Option<PathBuf>,
    cik_extractor_path: Option<PathBuf>,
}

impl Settings {
    /// Merge CLI overrides, `mc-lang-sync.json` and the environment.
    /// `EXPORT_LANGUAGES` wins over the file when set.
    pub fn resolve(overrides: SettingsOverrides) -> Self {
        let base_dir = overrides.base_dir;
        let file = load_settings_from_disk(&base_dir).unwrap_or_default();

        let languages = match std::env::var("EXPORT_LANGUAGES") {
            Ok(value) => LocaleFilter::parse(&value),
            Err(_) => file
                .export_languages
                .as_ref()
                .map(|list| LocaleFilter::parse(&list.join(",")))
                .unwrap_or_default(),
        };

        let retries = overrides
            .retries
            .or(file.retries)
            .unwrap_or(RetryPolicy::default().retries);

        Self {
            cache_dir: overrides.cache_dir.unwrap_or_else(default_cache_dir),
            tools_dir: overrides
                .tools_dir
                .unwrap_or_else(|| base_dir.join("tools")),
            retry: RetryPolicy::new(retries),
            languages,
            keep_packages: overrides.keep_packages || file.keep_packages.unwrap_or(false),
            xvdtool_path: file.xvdtool_path,
            cik_extractor_path: file.cik_extractor_path,
            base_dir,
        }
    }

    /// Settings rooted at `base_dir` with everything else defaulted; used by tests.
    pub fn for_base_dir(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            cache_dir: base_dir.join(".cache"),
            tools_dir: base_dir.join("tools"),
            retry: RetryPolicy::immediate(0),
            languages: LocaleFilter::all(),
            keep_packages: false,
            xvdtool_path: None,
            cik_extractor_path: None,
        }
    }

    pub fn bedrock_dir(&self) -> PathBuf {
        self.base_dir.join("bedrock")
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.bedrock_dir().join("extracted")
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.bedrock_dir().join("merged")
    }

    pub fn java_dir(&self) -> PathBuf {
        self.base_dir.join("java")
    }

    /// Downloaded game packages and client jars.
    pub fn packages_dir(&self) -> PathBuf {
        self.cache_dir.join("packages")
    }

    /// Per-version scratch space for extractor output.
    pub fn workspace_dir(&self) -> PathBuf {
        self.cache_dir.join("work")
    }

    pub fn cik_dir(&self) -> PathBuf {
        self.tools_dir.join("Cik")
    }

    pub fn xvdtool_path(&self) -> PathBuf {
        self.xvdtool_path.clone().unwrap_or_else(|| {
            let dir = self.tools_dir.join("XvdTool.Streaming").join("x64");
            dir.join(executable("XvdTool.Streaming"))
        })
    }

    pub fn cik_extractor_path(&self) -> PathBuf {
        self.cik_extractor_path.clone().unwrap_or_else(|| {
            self.tools_dir
                .join("CikExtractor")
                .join(executable("CikExtractor"))
        })
    }
}

fn executable(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn load_settings_from_disk(base_dir: &Path) -> Option<FileSettings> {
    let path = base_dir.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring malformed {:?}: {}", path, e);
            None
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}
