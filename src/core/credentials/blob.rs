use std::fmt;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::core::error::{SyncError, SyncResult};

/// Environment variable holding the encoded key blob.
pub const CIK_ENV: &str = "CIK_DATA";

/// Distribution ring a package belongs to. Each ring has its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Release,
    Preview,
}

impl Channel {
    /// Map the catalog's package type (`Release`, `Beta`, `Preview`).
    pub fn from_package_type(package_type: &str) -> Self {
        if package_type.eq_ignore_ascii_case("release") {
            Channel::Release
        } else {
            Channel::Preview
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Release => write!(f, "release"),
            Channel::Preview => write!(f, "preview"),
        }
    }
}

/// One decoded key: the product GUID and the raw `.cik` file contents.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey {
    pub guid: String,
    key: Vec<u8>,
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentKey")
            .field("guid", &self.guid)
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .finish()
    }
}

impl ContentKey {
    pub fn new(guid: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            guid: guid.into(),
            key,
        }
    }

    /// Parse a single `HEX@GUID` segment.
    fn parse_segment(segment: &str) -> SyncResult<Self> {
        let (hex_part, guid) = segment.split_once('@').ok_or_else(|| {
            SyncError::Configuration(format!("{CIK_ENV} segment is missing '@'"))
        })?;
        let guid = guid.trim();
        if guid.is_empty() {
            return Err(SyncError::Configuration(format!(
                "{CIK_ENV} segment has an empty GUID"
            )));
        }
        let key = hex::decode(hex_part.trim()).map_err(|e| {
            SyncError::Configuration(format!("{CIK_ENV} key for {guid} is not hex: {e}"))
        })?;
        if key.is_empty() {
            return Err(SyncError::Configuration(format!(
                "{CIK_ENV} key for {guid} is empty"
            )));
        }
        Ok(Self::new(guid, key))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn file_name(&self) -> String {
        format!("{}.cik", self.guid)
    }

    /// Write `<guid>.cik` into `dir`.
    pub fn write_to(&self, dir: &Path) -> SyncResult<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.bytes()).map_err(|e| SyncError::io(&path, e))?;
        Ok(path)
    }

    fn encode_segment(&self) -> String {
        format!("{}@{}", hex::encode_upper(&self.key), self.guid)
    }
}

/// Hands out key material to whoever needs to open a package.
pub trait Authenticator: Send + Sync {
    fn content_key(&self, channel: Channel) -> Option<&ContentKey>;
}

/// Keys decoded from `CIK_DATA`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentKeys {
    pub release: Option<ContentKey>,
    pub preview: Option<ContentKey>,
}

impl ContentKeys {
    /// Decode the raw `CIK_DATA` value; missing or blank is a configuration error.
    pub fn from_value(value: Option<String>) -> SyncResult<Self> {
        match value {
            Some(raw) if !raw.trim().is_empty() => Self::decode(&raw),
            _ => Err(SyncError::Configuration(format!(
                "{CIK_ENV} is not set; run `mc-lang-sync extract-cik` on a licensed machine"
            ))),
        }
    }

    /// Decode base64(`HEX@GUID&HEX@GUID`). The first segment is the release
    /// key, the second the preview key; either may be empty.
    pub fn decode(raw: &str) -> SyncResult<Self> {
        let bytes = STANDARD
            .decode(raw.trim())
            .map_err(|e| SyncError::Configuration(format!("{CIK_ENV} is not base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| SyncError::Configuration(format!("{CIK_ENV} is not UTF-8")))?;

        let segments: Vec<&str> = text.split('&').collect();
        if segments.len() > 2 {
            return Err(SyncError::Configuration(format!(
                "{CIK_ENV} has {} segments, expected at most 2",
                segments.len()
            )));
        }

        let parse = |segment: Option<&&str>| -> SyncResult<Option<ContentKey>> {
            match segment.map(|s| s.trim()) {
                Some(s) if !s.is_empty() => ContentKey::parse_segment(s).map(Some),
                _ => Ok(None),
            }
        };
        let keys = Self {
            release: parse(segments.first())?,
            preview: parse(segments.get(1))?,
        };

        if keys.release.is_none() && keys.preview.is_none() {
            return Err(SyncError::Configuration(format!(
                "{CIK_ENV} contains no keys"
            )));
        }
        Ok(keys)
    }

    pub fn encode(&self) -> String {
        let segment = |key: &Option<ContentKey>| {
            key.as_ref()
                .map(ContentKey::encode_segment)
                .unwrap_or_default()
        };
        let joined = format!("{}&{}", segment(&self.release), segment(&self.preview));
        STANDARD.encode(joined)
    }
}

impl Authenticator for ContentKeys {
    fn content_key(&self, channel: Channel) -> Option<&ContentKey> {
        match channel {
            Channel::Release => self.release.as_ref(),
            Channel::Preview => self.preview.as_ref(),
        }
    }
}
