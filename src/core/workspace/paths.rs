use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{BootstrapError, BootstrapResult};

pub const WORKSPACE_DIR_NAME: &str = "MinecraftModTemp";
pub const ARCHIVE_FILE_NAME: &str = "Minecraftmod.zip";
pub const EXTRACT_DIR_NAME: &str = "extracted";

/// Fixed locations used by one run. `root_dir` survives every run; the
/// archive and the extraction directory are recreated each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    root_dir: PathBuf,
    archive_file: PathBuf,
    extract_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn under(base_dir: &Path) -> Self {
        let root_dir = base_dir.join(WORKSPACE_DIR_NAME);
        Self {
            archive_file: root_dir.join(ARCHIVE_FILE_NAME),
            extract_dir: root_dir.join(EXTRACT_DIR_NAME),
            root_dir,
        }
    }

    /// Workspace under the per-user application data directory.
    pub fn from_app_data() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::under(&base)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn archive_file(&self) -> &Path {
        &self.archive_file
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    /// Create the root directory if it does not exist yet.
    pub fn ensure_workspace(&self) -> BootstrapResult<()> {
        if self.root_dir.is_dir() {
            debug!("Workspace already present at {:?}", self.root_dir);
            return Ok(());
        }
        std::fs::create_dir_all(&self.root_dir)
            .map_err(|source| BootstrapError::io(&self.root_dir, source))?;
        info!("Created workspace {:?}", self.root_dir);
        Ok(())
    }

    /// Remove the archive and extraction directory left by a previous run.
    pub fn clean_stale_artifacts(&self) -> BootstrapResult<()> {
        if self.archive_file.exists() {
            std::fs::remove_file(&self.archive_file)
                .map_err(|source| BootstrapError::io(&self.archive_file, source))?;
            info!("Removed stale archive {:?}", self.archive_file);
        }

        if self.extract_dir.exists() {
            std::fs::remove_dir_all(&self.extract_dir)
                .map_err(|source| BootstrapError::io(&self.extract_dir, source))?;
            info!("Removed stale extraction directory {:?}", self.extract_dir);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_use_fixed_names() {
        let paths = WorkspacePaths::under(Path::new("/data"));
        assert_eq!(paths.root_dir(), Path::new("/data/MinecraftModTemp"));
        assert_eq!(
            paths.archive_file(),
            Path::new("/data/MinecraftModTemp/Minecraftmod.zip")
        );
        assert_eq!(
            paths.extract_dir(),
            Path::new("/data/MinecraftModTemp/extracted")
        );
    }

    #[test]
    fn ensure_workspace_is_idempotent_and_keeps_content() {
        let base = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::under(base.path());

        paths.ensure_workspace().unwrap();
        let marker = paths.root_dir().join("keep.txt");
        std::fs::write(&marker, b"keep").unwrap();
        paths.ensure_workspace().unwrap();

        assert!(marker.exists());
    }

    #[test]
    fn clean_removes_only_stale_artifacts() {
        let base = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::under(base.path());
        paths.ensure_workspace().unwrap();

        std::fs::write(paths.archive_file(), b"old").unwrap();
        std::fs::create_dir_all(paths.extract_dir().join("nested")).unwrap();
        let marker = paths.root_dir().join("bootstrap_settings.json");
        std::fs::write(&marker, b"{}").unwrap();

        paths.clean_stale_artifacts().unwrap();

        assert!(!paths.archive_file().exists());
        assert!(!paths.extract_dir().exists());
        assert!(marker.exists());
    }

    #[test]
    fn clean_on_fresh_workspace_is_noop() {
        let base = tempfile::tempdir().unwrap();
        let paths = WorkspacePaths::under(base.path());
        paths.ensure_workspace().unwrap();
        paths.clean_stale_artifacts().unwrap();
        assert!(paths.root_dir().is_dir());
    }
}
