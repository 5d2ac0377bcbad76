use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::core::error::{BootstrapError, BootstrapResult};

/// One way of unpacking an archive into an existing, empty directory.
pub trait ArchiveStrategy {
    fn name(&self) -> &'static str;
    fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> BootstrapResult<()>;
}

/// In-process reader from the `zip` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipCrateStrategy;

impl ArchiveStrategy for ZipCrateStrategy {
    fn name(&self) -> &'static str {
        "zip reader"
    }

    fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> BootstrapResult<()> {
        let file = File::open(archive_path).map_err(|e| {
            BootstrapError::Extraction(format!("cannot open {}: {e}", archive_path.display()))
        })?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
        debug!("Archive {:?} holds {} entries", archive_path, archive.len());
        // Entry names are resolved through `enclosed_name`, so nothing lands
        // outside `dest_dir`.
        archive.extract(dest_dir)?;
        Ok(())
    }
}

/// The archiver shipped with the operating system: `tar` (bsdtar) on
/// Windows, `unzip` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemArchiverStrategy;

impl SystemArchiverStrategy {
    fn command(archive_path: &Path, dest_dir: &Path) -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("tar");
            cmd.arg("-xf").arg(archive_path).arg("-C").arg(dest_dir);
            cmd
        } else {
            let mut cmd = Command::new("unzip");
            cmd.arg("-o").arg("-q").arg(archive_path).arg("-d").arg(dest_dir);
            cmd
        }
    }
}

impl ArchiveStrategy for SystemArchiverStrategy {
    fn name(&self) -> &'static str {
        "system archiver"
    }

    fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> BootstrapResult<()> {
        let mut cmd = Self::command(archive_path, dest_dir);
        cmd.stdin(Stdio::null());
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            BootstrapError::Extraction(format!(
                "could not run {}: {e}",
                cmd.get_program().to_string_lossy()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootstrapError::Extraction(format!(
                "{} exited with {}: {}",
                cmd.get_program().to_string_lossy(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Static dispatch over the strategies the extractor tries, in order.
#[derive(Debug, Clone, Copy)]
pub enum ExtractStrategy {
    ZipCrate(ZipCrateStrategy),
    SystemArchiver(SystemArchiverStrategy),
    /// Leaves a stray file behind and errors.
    #[cfg(test)]
    Broken,
}

impl ExtractStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractStrategy::ZipCrate(s) => s.name(),
            ExtractStrategy::SystemArchiver(s) => s.name(),
            #[cfg(test)]
            ExtractStrategy::Broken => "broken",
        }
    }

    pub fn unpack(&self, archive_path: &Path, dest_dir: &Path) -> BootstrapResult<()> {
        match self {
            ExtractStrategy::ZipCrate(s) => s.unpack(archive_path, dest_dir),
            ExtractStrategy::SystemArchiver(s) => s.unpack(archive_path, dest_dir),
            #[cfg(test)]
            ExtractStrategy::Broken => {
                std::fs::write(dest_dir.join("partial.bin"), b"half")?;
                Err(BootstrapError::Extraction("unpacking aborted".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_reader_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"this is not a zip archive").unwrap();
        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();

        let err = ZipCrateStrategy.unpack(&archive, &dest).unwrap_err();
        assert!(matches!(err, BootstrapError::Zip(_)));
    }

    #[test]
    fn system_archiver_reports_failure_as_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"garbage").unwrap();
        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();

        let err = SystemArchiverStrategy.unpack(&archive, &dest).unwrap_err();
        assert!(matches!(err, BootstrapError::Extraction(_)));
    }
}
