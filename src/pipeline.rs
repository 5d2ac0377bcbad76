use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::core::downloader::{DownloadResult, Downloader, ProgressSink};
use crate::core::error::BootstrapError;
use crate::core::extract::{ExtractionResult, Extractor};
use crate::core::http::build_http_client;
use crate::core::launch::{self, LaunchHandle};
use crate::core::locate::{self, InstallerCandidate};
use crate::core::state::BootstrapSettings;
use crate::core::workspace::{ensure_min_disk_space, WorkspacePaths};

/// Step of the pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Workspace,
    Download,
    Extract,
    Locate,
    Launch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Workspace => write!(f, "workspace setup"),
            Stage::Download => write!(f, "download"),
            Stage::Extract => write!(f, "extraction"),
            Stage::Locate => write!(f, "installer search"),
            Stage::Launch => write!(f, "installer launch"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: BootstrapError,
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub paths: WorkspacePaths,
    pub download: DownloadResult,
    pub extraction: ExtractionResult,
    pub candidate: InstallerCandidate,
    pub launch: LaunchHandle,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, PipelineFailure>;
}

impl<T> AtStage<T> for Result<T, BootstrapError> {
    fn at(self, stage: Stage) -> Result<T, PipelineFailure> {
        self.map_err(|error| PipelineFailure { stage, error })
    }
}

/// Workspace → Fetch → Extract → Locate → Launch. The first failing stage
/// ends the run; nothing is retried.
pub async fn run_pipeline(
    settings: &BootstrapSettings,
    paths: &WorkspacePaths,
    progress: Option<ProgressSink>,
) -> Result<PipelineOutcome, PipelineFailure> {
    info!("[1/5] Preparing workspace {:?}", paths.root_dir());
    paths.ensure_workspace().at(Stage::Workspace)?;
    paths.clean_stale_artifacts().at(Stage::Workspace)?;

    info!("[2/5] Downloading {}", settings.archive_url);
    let min_free_bytes = settings.min_free_disk_mb.saturating_mul(1024 * 1024);
    ensure_min_disk_space(paths.root_dir(), min_free_bytes).at(Stage::Download)?;
    let client = build_http_client(settings)
        .map_err(|source| BootstrapError::Transfer {
            url: settings.archive_url.clone(),
            source,
        })
        .at(Stage::Download)?;
    let mut downloader = Downloader::new(client);
    if let Some(sink) = progress {
        downloader = downloader.with_progress(sink);
    }
    let download = downloader
        .download(&settings.archive_url, paths.archive_file())
        .await
        .at(Stage::Download)?;

    info!("[3/5] Extracting {:?}", download.file_path);
    let extraction = Extractor::default()
        .extract(paths.archive_file(), paths.extract_dir())
        .at(Stage::Extract)?;

    info!("[4/5] Searching for the installer");
    let candidate = locate::locate(&extraction.extract_dir).at(Stage::Locate)?;
    info!(
        "Selected {:?} via {}",
        candidate.executable_path, candidate.discovery_method
    );

    info!("[5/5] Launching installer");
    let launch = launch::launch(&candidate.executable_path, settings.grace_period())
        .await
        .at(Stage::Launch)?;

    Ok(PipelineOutcome {
        paths: paths.clone(),
        download,
        extraction,
        candidate,
        launch,
    })
}
