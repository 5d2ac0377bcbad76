// ─── Installer Locator ───
// Picks the executable to start from the extracted tree. Rules, first hit wins:
//   1. a directory named `installer`: its `setup.exe`, else its first `.exe`
//   2. any `setup.exe`, at any depth
//   3. any `.exe`, at any depth (degraded match)

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::error::{BootstrapError, BootstrapResult};

const INSTALLER_DIR: &str = "installer";
const SETUP_EXE: &str = "setup.exe";
const EXE_EXTENSION: &str = "exe";

/// Which rule produced the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMethod {
    InstallerFolderSetup,
    InstallerFolderAlternate,
    RecursiveSetupSearch,
    FirstExeFallback,
}

impl DiscoveryMethod {
    /// `true` for the best-effort rule that takes any executable.
    pub fn is_fallback(&self) -> bool {
        matches!(self, DiscoveryMethod::FirstExeFallback)
    }
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryMethod::InstallerFolderSetup => write!(f, "installer-folder/setup.exe"),
            DiscoveryMethod::InstallerFolderAlternate => {
                write!(f, "installer-folder alternate .exe")
            }
            DiscoveryMethod::RecursiveSetupSearch => write!(f, "recursive setup.exe search"),
            DiscoveryMethod::FirstExeFallback => write!(f, "first-found .exe fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerCandidate {
    pub executable_path: PathBuf,
    pub discovery_method: DiscoveryMethod,
}

impl InstallerCandidate {
    fn new(executable_path: PathBuf, discovery_method: DiscoveryMethod) -> Self {
        Self {
            executable_path,
            discovery_method,
        }
    }
}

/// Find the installer executable below `extract_dir`.
///
/// Directory walks are sorted by file name, so ties inside one directory are
/// broken lexicographically. Names compare ASCII-case-insensitively.
#[instrument]
pub fn locate(extract_dir: &Path) -> BootstrapResult<InstallerCandidate> {
    if !extract_dir.is_dir() {
        return Err(BootstrapError::InstallerNotFound(format!(
            "extraction directory {:?} does not exist",
            extract_dir
        )));
    }

    if let Some(installer_dir) = find_installer_dir(extract_dir) {
        info!("Found installer folder {:?}", installer_dir);
        return locate_in_installer_dir(&installer_dir);
    }

    debug!("No installer folder, searching for {SETUP_EXE}");
    if let Some(setup) = walk_files(extract_dir).find(|path| is_setup_exe(path)) {
        info!("Found {SETUP_EXE} at {:?}", setup);
        return Ok(InstallerCandidate::new(
            setup,
            DiscoveryMethod::RecursiveSetupSearch,
        ));
    }

    debug!("No {SETUP_EXE} anywhere, falling back to any executable");
    match walk_files(extract_dir).find(|path| is_exe(path)) {
        Some(exe) => {
            warn!(
                "Using first executable found {:?}; this may not be the installer",
                exe
            );
            Ok(InstallerCandidate::new(exe, DiscoveryMethod::FirstExeFallback))
        }
        None => Err(BootstrapError::InstallerNotFound(
            "no executable files found in archive".into(),
        )),
    }
}

fn locate_in_installer_dir(installer_dir: &Path) -> BootstrapResult<InstallerCandidate> {
    let direct_files = || {
        WalkDir::new(installer_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
    };

    if let Some(setup) = direct_files().find(|path| is_setup_exe(path)) {
        return Ok(InstallerCandidate::new(
            setup,
            DiscoveryMethod::InstallerFolderSetup,
        ));
    }

    match direct_files().find(|path| is_exe(path)) {
        Some(exe) => {
            info!("{SETUP_EXE} missing, using {:?} from installer folder", exe);
            Ok(InstallerCandidate::new(
                exe,
                DiscoveryMethod::InstallerFolderAlternate,
            ))
        }
        None => Err(BootstrapError::InstallerNotFound(
            "setup.exe not found in installer folder".into(),
        )),
    }
}

fn find_installer_dir(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_dir() && name_matches(entry.file_name(), INSTALLER_DIR))
        .map(DirEntry::into_path)
}

fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
}

fn name_matches(name: &OsStr, expected: &str) -> bool {
    name.to_str()
        .map(|n| n.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

fn is_setup_exe(path: &Path) -> bool {
    path.file_name()
        .map(|n| name_matches(n, SETUP_EXE))
        .unwrap_or(false)
}

fn is_exe(path: &Path) -> bool {
    path.extension()
        .map(|ext| name_matches(ext, EXE_EXTENSION))
        .unwrap_or(false)
}
