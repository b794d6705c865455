use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the whole sync pipeline.
/// Every module returns `Result<T, SyncError>`.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── Setup ───────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Credential rejected: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Extraction ──────────────────────────────────────
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Decoding ────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    // ── Source control ──────────────────────────────────
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },
}

/// Convenience alias used throughout the crate.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification used for retry decisions and process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Auth,
    NotFound,
    Network,
    Extraction,
    Io,
    SourceControl,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::Auth => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Network => 5,
            ErrorKind::Extraction => 6,
            ErrorKind::Io => 7,
            ErrorKind::SourceControl => 8,
        }
    }
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Configuration(_) => ErrorKind::Configuration,
            SyncError::Auth(_) => ErrorKind::Auth,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Io { .. } => ErrorKind::Io,
            SyncError::Http(_) | SyncError::Sha1Mismatch { .. } => ErrorKind::Network,
            SyncError::Json(_) | SyncError::Xml(_) => ErrorKind::Network,
            SyncError::DownloadFailed { status, .. } => match status {
                401 | 403 => ErrorKind::Auth,
                404 | 410 => ErrorKind::NotFound,
                _ => ErrorKind::Network,
            },
            SyncError::Extraction(_) | SyncError::Zip(_) => ErrorKind::Extraction,
            SyncError::Git { .. } => ErrorKind::SourceControl,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err.is_body()
                    || err.status().is_some_and(|s| s.is_server_error())
            }
            SyncError::DownloadFailed { status, .. } => *status == 429 || *status >= 500,
            SyncError::Sha1Mismatch { .. } => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(source: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<walkdir::Error> for SyncError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("directory walk loop detected"));
        SyncError::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_status_maps_to_kind() {
        let err = |status| SyncError::DownloadFailed {
            url: "https://example.com/pkg".into(),
            status,
        };
        assert_eq!(err(403).kind(), ErrorKind::Auth);
        assert_eq!(err(404).kind(), ErrorKind::NotFound);
        assert_eq!(err(503).kind(), ErrorKind::Network);
        assert!(err(503).is_transient());
        assert!(err(429).is_transient());
        assert!(!err(404).is_transient());
    }

    #[test]
    fn setup_errors_are_never_retried() {
        assert!(!SyncError::Configuration("CIK_DATA".into()).is_transient());
        assert!(!SyncError::Auth("rejected".into()).is_transient());
        assert!(!SyncError::Extraction("exit 1".into()).is_transient());
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::Configuration,
            ErrorKind::Auth,
            ErrorKind::NotFound,
            ErrorKind::Network,
            ErrorKind::Extraction,
            ErrorKind::Io,
            ErrorKind::SourceControl,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|c| *c != 0));
    }
}
