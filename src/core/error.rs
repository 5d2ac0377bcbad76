use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the bootstrapper.
/// Every stage returns `Result<T, BootstrapError>`.
#[derive(Debug, Error)]
pub enum BootstrapError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("Transfer of {url} failed: {source}")]
    Transfer {
        url: String,
        source: reqwest::Error,
    },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download error: {0}")]
    Download(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    // ── Installer ───────────────────────────────────────
    #[error("Installer not found: {0}")]
    InstallerNotFound(String),

    #[error("Launch error: {0}")]
    Launch(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Coarse classification of a failure, independent of the variant carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Download,
    Extraction,
    InstallerNotFound,
    Launch,
    Pipeline,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Download => write!(f, "DownloadError"),
            ErrorKind::Extraction => write!(f, "ExtractionError"),
            ErrorKind::InstallerNotFound => write!(f, "InstallerNotFoundError"),
            ErrorKind::Launch => write!(f, "LaunchError"),
            ErrorKind::Pipeline => write!(f, "PipelineError"),
        }
    }
}

impl BootstrapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BootstrapError::Transfer { .. }
            | BootstrapError::DownloadFailed { .. }
            | BootstrapError::Download(_) => ErrorKind::Download,
            BootstrapError::Zip(_) | BootstrapError::Extraction(_) => ErrorKind::Extraction,
            BootstrapError::InstallerNotFound(_) => ErrorKind::InstallerNotFound,
            BootstrapError::Launch(_) => ErrorKind::Launch,
            // Workspace and settings I/O; stages map their own I/O failures.
            BootstrapError::Io { .. } | BootstrapError::Json(_) => ErrorKind::Pipeline,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BootstrapError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(source: std::io::Error) -> Self {
        BootstrapError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
