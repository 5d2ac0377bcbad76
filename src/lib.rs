pub mod core;
pub mod pipeline;

use std::process::ExitCode;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::core::downloader::{DownloadProgress, ProgressSink};
use crate::core::report;
use crate::core::state::BootstrapSettings;
use crate::core::workspace::WorkspacePaths;
use crate::pipeline::{PipelineFailure, PipelineOutcome};

/// Entry point of the binary: one full bootstrap run.
pub fn run() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bootstrapper_lib=debug")),
        )
        .init();

    info!("MinecraftMod bootstrapper starting...");

    let paths = WorkspacePaths::from_app_data();
    let settings = BootstrapSettings::load_or_default(paths.root_dir());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Could not start async runtime: {err}");
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(execute(&settings, &paths));
    let code = exit_code(&result);
    if code != 0 {
        std::thread::sleep(settings.exit_delay());
    }
    ExitCode::from(code)
}

/// Run the pipeline and report its outcome.
pub async fn execute(
    settings: &BootstrapSettings,
    paths: &WorkspacePaths,
) -> Result<PipelineOutcome, PipelineFailure> {
    let started = Instant::now();
    let result = pipeline::run_pipeline(settings, paths, Some(log_progress())).await;

    match &result {
        Ok(outcome) => report::report_success(outcome, started.elapsed()),
        Err(failure) => report::report_failure(failure, paths, started.elapsed()),
    }
    result
}

/// `0` once the installer was launched, `1` for any failure.
pub fn exit_code<T>(result: &Result<T, PipelineFailure>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn log_progress() -> ProgressSink {
    Box::new(|progress: &DownloadProgress| -> std::io::Result<()> {
        info!(
            "Download progress: {}% ({} / {} bytes)",
            progress.percent,
            progress.bytes_downloaded,
            progress.total_bytes.unwrap_or_default()
        );
        Ok(())
    })
}
