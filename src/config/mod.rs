pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveSettings {
    /// Seconds a compression tool may run before it is killed. `None` waits forever.
    pub process_timeout_secs: Option<u64>,
    pub registry_timeout_ms: u64,
    /// Per-stream cap on captured tool output.
    pub output_cap_bytes: usize,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            process_timeout_secs: Some(600),
            registry_timeout_ms: 3000,
            output_cap_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Where the per-kind catalog files live. `None` means the platform data dir.
    pub catalog_directory: Option<PathBuf>,
    pub archive: ArchiveSettings,
    pub audit_concurrency: usize,
    pub notify_missing_files: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn catalog_directory(&self) -> Option<PathBuf> {
        self.catalog_directory
            .clone()
            .or_else(|| settings::get_data_directory().map(|d| d.join("catalogs")))
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.archive.process_timeout_secs.map(Duration::from_secs)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.archive.registry_timeout_ms)
    }

    pub fn audit_concurrency(&self) -> usize {
        self.audit_concurrency.max(1)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_directory: None,
            archive: ArchiveSettings::default(),
            audit_concurrency: 1,
            notify_missing_files: true,
        }
    }
}
