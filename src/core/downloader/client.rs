use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::core::error::{BootstrapError, BootstrapResult};

/// Payload handed to the progress sink on every 10% milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadProgress {
    pub url: String,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub percent: u8,
}

/// Best-effort progress observer. Its errors are logged and dropped.
pub type ProgressSink = Box<dyn Fn(&DownloadProgress) -> std::io::Result<()> + Send + Sync>;

/// Outcome of a completed transfer.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub file_path: PathBuf,
    pub byte_size: u64,
    pub elapsed: Duration,
    /// Hex SHA-256 of the received bytes, for the log only.
    pub sha256: String,
}

/// Streaming single-file downloader.
pub struct Downloader {
    client: Client,
    /// Optional observer for coarse progress.
    progress: Option<ProgressSink>,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Stream `url` into `dest`.
    ///
    /// Fails when the server answers with a non-success status, when the
    /// stream breaks, when fewer bytes than announced arrive, or when `dest`
    /// is missing or empty afterwards. There is no retry.
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str, dest: &Path) -> BootstrapResult<DownloadResult> {
        let started = Instant::now();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| write_failed(parent, source))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| BootstrapError::Transfer {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        match total_bytes {
            Some(total) => info!("Downloading {} ({} bytes)", url, total),
            None => info!("Downloading {} (size unknown)", url),
        }

        let (downloaded, digest) = match self.stream_to_file(url, response, dest, total_bytes).await {
            Ok(received) => received,
            Err(err) => {
                discard_partial(dest).await;
                return Err(err);
            }
        };
        debug!("Received {} bytes from {}", downloaded, url);

        let byte_size = verify_downloaded_file(dest).await?;
        let sha256 = hex::encode(digest);
        let elapsed = started.elapsed();
        info!(
            "Downloaded {} bytes to {:?} in {:?} (sha256 {})",
            byte_size, dest, elapsed, sha256
        );

        Ok(DownloadResult {
            file_path: dest.to_path_buf(),
            byte_size,
            elapsed,
            sha256,
        })
    }

    /// Write the body to `dest`, hashing as it goes. Returns the byte count
    /// and the SHA-256 digest.
    async fn stream_to_file(
        &self,
        url: &str,
        response: reqwest::Response,
        dest: &Path,
        total_bytes: Option<u64>,
    ) -> BootstrapResult<(u64, Vec<u8>)> {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| write_failed(dest, source))?;

        let mut hasher = Sha256::new();
        let mut downloaded = 0_u64;
        let mut last_milestone = 0_u8;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| BootstrapError::Transfer {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|source| write_failed(dest, source))?;
            hasher.update(&chunk);
            downloaded = downloaded.saturating_add(chunk.len() as u64);

            if let Some(milestone) = progress_milestone(downloaded, total_bytes) {
                if milestone > last_milestone {
                    last_milestone = milestone;
                    self.notify(DownloadProgress {
                        url: url.to_string(),
                        bytes_downloaded: downloaded,
                        total_bytes,
                        percent: milestone,
                    });
                }
            }
        }

        file.flush()
            .await
            .map_err(|source| write_failed(dest, source))?;

        if let Some(expected) = total_bytes {
            check_received_size(url, expected, downloaded)?;
        }
        Ok((downloaded, hasher.finalize().to_vec()))
    }

    fn notify(&self, progress: DownloadProgress) {
        let Some(sink) = &self.progress else {
            return;
        };
        if let Err(err) = sink(&progress) {
            debug!("Progress sink failed at {}%: {}", progress.percent, err);
        }
    }
}

/// Progress rounded down to the last multiple of 10, or `None` when the
/// total is unknown or the first milestone has not been reached.
fn progress_milestone(downloaded: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (u128::from(downloaded) * 100 / u128::from(total)).min(100) as u8;
    let milestone = percent / 10 * 10;
    (milestone >= 10).then_some(milestone)
}

fn check_received_size(url: &str, expected: u64, received: u64) -> BootstrapResult<()> {
    if received == expected {
        return Ok(());
    }
    Err(BootstrapError::Download(format!(
        "size mismatch for {url}: expected {expected} bytes, received {received}"
    )))
}

fn write_failed(dest: &Path, source: std::io::Error) -> BootstrapError {
    BootstrapError::Download(format!("cannot write {}: {source}", dest.display()))
}

/// Remove a partially written archive. A `dest` that is not a file is left alone.
async fn discard_partial(dest: &Path) {
    if tokio::fs::metadata(dest).await.is_ok_and(|m| m.is_file()) {
        if let Err(err) = tokio::fs::remove_file(dest).await {
            warn!("Could not remove partial download {:?}: {}", dest, err);
        }
    }
}

async fn verify_downloaded_file(dest: &Path) -> BootstrapResult<u64> {
    let metadata = match tokio::fs::metadata(dest).await {
        Ok(metadata) => metadata,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Err(BootstrapError::Download(format!(
                "file not found at path {}",
                dest.display()
            )));
        }
        Err(source) => {
            return Err(BootstrapError::Download(format!(
                "cannot inspect {}: {source}",
                dest.display()
            )));
        }
    };

    if !metadata.is_file() || metadata.len() == 0 {
        return Err(BootstrapError::Download(format!(
            "downloaded file is empty at path {}",
            dest.display()
        )));
    }

    Ok(metadata.len())
}
