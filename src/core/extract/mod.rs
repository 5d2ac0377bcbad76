pub mod strategy;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::core::error::{BootstrapError, BootstrapResult};

pub use strategy::{ArchiveStrategy, ExtractStrategy, SystemArchiverStrategy, ZipCrateStrategy};

/// Outcome of a successful extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub extract_dir: PathBuf,
    /// Files and directories below `extract_dir`, counted recursively.
    pub entry_count: usize,
    pub elapsed: Duration,
    /// Name of the strategy that produced the tree.
    pub strategy: &'static str,
}

/// Unpacks the downloaded archive, falling back through its strategies.
pub struct Extractor {
    strategies: Vec<ExtractStrategy>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_strategies(vec![
            ExtractStrategy::ZipCrate(ZipCrateStrategy),
            ExtractStrategy::SystemArchiver(SystemArchiverStrategy),
        ])
    }
}

impl Extractor {
    pub fn with_strategies(strategies: Vec<ExtractStrategy>) -> Self {
        Self { strategies }
    }

    /// Extract `archive_path` into a freshly recreated `dest_dir`.
    ///
    /// Each strategy starts from an empty `dest_dir`. A strategy that errors
    /// or leaves the directory empty hands over to the next one; the call
    /// fails only when every strategy did.
    #[instrument(skip(self))]
    pub fn extract(&self, archive_path: &Path, dest_dir: &Path) -> BootstrapResult<ExtractionResult> {
        let started = Instant::now();
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            recreate_dir(dest_dir)?;
            info!("Extracting {:?} with {}", archive_path, strategy.name());

            let outcome = strategy.unpack(archive_path, dest_dir).and_then(|()| {
                if dir_is_empty(dest_dir)? {
                    Err(BootstrapError::Extraction(
                        "archive produced no entries".into(),
                    ))
                } else {
                    Ok(())
                }
            });

            match outcome {
                Ok(()) => {
                    let entry_count = count_entries(dest_dir);
                    let elapsed = started.elapsed();
                    info!(
                        "Extracted {} entries into {:?} in {:?}",
                        entry_count, dest_dir, elapsed
                    );
                    return Ok(ExtractionResult {
                        extract_dir: dest_dir.to_path_buf(),
                        entry_count,
                        elapsed,
                        strategy: strategy.name(),
                    });
                }
                Err(err) => {
                    warn!("{} failed: {}", strategy.name(), err);
                    failures.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }

        Err(BootstrapError::Extraction(format!(
            "every extraction strategy failed ({})",
            failures.join("; ")
        )))
    }
}

fn recreate_dir(dir: &Path) -> BootstrapResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| dir_failed("clear", dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| dir_failed("create", dir, e))
}

fn dir_is_empty(dir: &Path) -> BootstrapResult<bool> {
    let mut entries = std::fs::read_dir(dir).map_err(|e| dir_failed("read", dir, e))?;
    Ok(entries.next().is_none())
}

fn dir_failed(action: &str, dir: &Path, source: std::io::Error) -> BootstrapError {
    BootstrapError::Extraction(format!("cannot {action} {}: {source}", dir.display()))
}

/// Recursive entry count, for reporting. Unreadable entries are skipped.
fn count_entries(dir: &Path) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .count()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::core::error::ErrorKind;

    fn write_archive(path: &Path, files: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, body) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_archive(
            &archive,
            &[("installer/setup.exe", "MZ"), ("readme.txt", "hello")],
        );
        let dest = dir.path().join("extracted");

        let result = Extractor::default().extract(&archive, &dest).unwrap();

        assert!(dest.join("installer/setup.exe").is_file());
        assert!(dest.join("readme.txt").is_file());
        // installer/, installer/setup.exe, readme.txt
        assert_eq!(result.entry_count, 3);
        assert_eq!(result.strategy, "zip reader");
    }

    #[test]
    fn repeated_extraction_yields_same_count() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_archive(
            &archive,
            &[("a/b/c.txt", "1"), ("a/d.exe", "2"), ("e.bin", "3")],
        );
        let dest = dir.path().join("extracted");
        let extractor = Extractor::default();

        let first = extractor.extract(&archive, &dest).unwrap();
        std::fs::write(dest.join("leftover.tmp"), b"stale").unwrap();
        let second = extractor.extract(&archive, &dest).unwrap();

        assert_eq!(first.entry_count, second.entry_count);
        assert!(!dest.join("leftover.tmp").exists());
    }

    #[test]
    fn both_strategies_failing_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"definitely not an archive").unwrap();

        let err = Extractor::default()
            .extract(&archive, &dir.path().join("extracted"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extraction);
        let message = err.to_string();
        assert!(message.contains("zip reader"));
        assert!(message.contains("system archiver"));
    }

    #[test]
    fn falls_back_after_failed_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_archive(&archive, &[("installer/setup.exe", "MZ"), ("readme.txt", "hi")]);
        let dest = dir.path().join("extracted");

        let result = Extractor::with_strategies(vec![
            ExtractStrategy::Broken,
            ExtractStrategy::ZipCrate(ZipCrateStrategy),
        ])
        .extract(&archive, &dest)
        .unwrap();

        assert_eq!(result.strategy, "zip reader");
        assert_eq!(result.entry_count, 3);
        assert!(dest.join("installer/setup.exe").is_file());
        assert!(!dest.join("partial.bin").exists());
    }

    #[cfg(unix)]
    #[test]
    fn system_archiver_takes_over_after_failure() {
        if std::process::Command::new("unzip").arg("-v").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pack.zip");
        write_archive(&archive, &[("installer/setup.exe", "MZ"), ("readme.txt", "hi")]);
        let dest = dir.path().join("extracted");

        let result = Extractor::with_strategies(vec![
            ExtractStrategy::Broken,
            ExtractStrategy::SystemArchiver(SystemArchiverStrategy),
        ])
        .extract(&archive, &dest)
        .unwrap();

        assert_eq!(result.strategy, "system archiver");
        assert_eq!(result.entry_count, 3);
        assert!(dest.join("installer/setup.exe").is_file());
        assert!(dest.join("readme.txt").is_file());
        assert!(!dest.join("partial.bin").exists());
    }

    #[test]
    fn empty_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.zip");
        write_archive(&archive, &[]);

        let err = Extractor::with_strategies(vec![ExtractStrategy::ZipCrate(ZipCrateStrategy)])
            .extract(&archive, &dir.path().join("extracted"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }
}
