// ─── Outcome Reporter ───
// Final summary of a run. Lines are built separately from logging.

use std::error::Error as _;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::core::workspace::{dir_size, format_bytes, WorkspacePaths};
use crate::pipeline::{PipelineFailure, PipelineOutcome};

pub const REMEDIATION_HINTS: [&str; 4] = [
    "Check your internet connection",
    "Make sure you have write permission to the application data folder",
    "Verify that the download URL is reachable",
    "Make sure there is enough free disk space",
];

pub fn success_lines(outcome: &PipelineOutcome, total: Duration) -> Vec<String> {
    let root = outcome.paths.root_dir();
    let mut lines = vec![
        "==== INSTALLER STARTED ====".to_string(),
        format!(
            "Archive: {} ({}) in {:?}",
            outcome.download.file_path.display(),
            format_bytes(outcome.download.byte_size),
            outcome.download.elapsed
        ),
        format!(
            "Extracted {} entries into {} using {} in {:?}",
            outcome.extraction.entry_count,
            outcome.extraction.extract_dir.display(),
            outcome.extraction.strategy,
            outcome.extraction.elapsed
        ),
        format!(
            "Installer: {} (found by {})",
            outcome.candidate.executable_path.display(),
            outcome.candidate.discovery_method
        ),
        format!(
            "Process: {} (PID {}), running after grace period: {}",
            outcome.launch.process_name,
            outcome.launch.process_id,
            if outcome.launch.is_alive_after_grace_period {
                "yes"
            } else {
                "no"
            }
        ),
        format!("Total time: {:?}", total),
        format!(
            "Workspace {} is kept on purpose (archive and extracted files are NOT deleted)",
            root.display()
        ),
        format!("Workspace size: {}", format_bytes(dir_size(root))),
        format!("Finished at {}", Utc::now().to_rfc3339()),
    ];

    if outcome.candidate.discovery_method.is_fallback() {
        lines.push(
            "Warning: the installer was picked by the any-executable fallback".to_string(),
        );
    }
    if !outcome.launch.is_alive_after_grace_period {
        lines.push(
            "Warning: the installer exited quickly (possibly quick installation)".to_string(),
        );
    }
    lines
}

pub fn failure_lines(
    failure: &PipelineFailure,
    paths: &WorkspacePaths,
    total: Duration,
) -> Vec<String> {
    let mut lines = vec![
        "==== BOOTSTRAP FAILED ====".to_string(),
        format!("Step: {}", failure.stage),
        format!("Error ({}): {}", failure.error.kind(), failure.error),
    ];

    let mut cause = failure.error.source();
    while let Some(err) = cause {
        lines.push(format!("Caused by: {err}"));
        cause = err.source();
    }

    lines.push(format!("Total time: {:?}", total));
    lines.push(format!("Workspace: {}", paths.root_dir().display()));
    lines.push("Things to check:".to_string());
    lines.extend(REMEDIATION_HINTS.iter().map(|hint| format!("  - {hint}")));
    lines
}

pub fn report_success(outcome: &PipelineOutcome, total: Duration) {
    for line in success_lines(outcome, total) {
        if line.starts_with("Warning:") {
            warn!("{line}");
        } else {
            info!("{line}");
        }
    }
}

pub fn report_failure(failure: &PipelineFailure, paths: &WorkspacePaths, total: Duration) {
    for line in failure_lines(failure, paths, total) {
        error!("{line}");
    }
}
