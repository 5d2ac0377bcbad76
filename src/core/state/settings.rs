use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{BootstrapError, BootstrapResult};

pub const SETTINGS_FILE: &str = "bootstrap_settings.json";

const DEFAULT_ARCHIVE_URL: &str = "https://downloads.example.com/minecraftmod/Minecraftmod.zip";
const DEFAULT_USER_AGENT: &str = "MinecraftModBootstrapper/0.1.0";

/// Tunables for one bootstrap run. Every field has a default so a partial
/// `bootstrap_settings.json` is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootstrapSettings {
    pub archive_url: String,
    pub user_agent: String,
    /// Delay between launching the installer and the liveness check.
    pub grace_period_ms: u64,
    /// Delay before the process exits after a failure.
    pub exit_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Free space required at the workspace before downloading. 0 disables the check.
    pub min_free_disk_mb: u64,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            grace_period_ms: 3_000,
            exit_delay_ms: 3_000,
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
            min_free_disk_mb: 256,
        }
    }
}

impl BootstrapSettings {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(self.exit_delay_ms)
    }

    /// Load settings from `<root_dir>/bootstrap_settings.json`.
    ///
    /// A missing file is the normal case and yields defaults. A file that
    /// cannot be read or parsed is reported and ignored.
    pub fn load_or_default(root_dir: &Path) -> Self {
        match load_settings_from_disk(root_dir) {
            Ok(Some(settings)) => {
                debug!("Loaded settings from {:?}", root_dir.join(SETTINGS_FILE));
                settings
            }
            Ok(None) => Self::default(),
            Err(err) => {
                warn!("Ignoring settings file: {err}");
                Self::default()
            }
        }
    }
}

fn load_settings_from_disk(root_dir: &Path) -> BootstrapResult<Option<BootstrapSettings>> {
    let path = root_dir.join(SETTINGS_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(BootstrapError::io(path, source)),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
