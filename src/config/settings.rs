use anyhow::Result;
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{AppConfig, ArchiveSettings};

const APP_NAME: &str = "MediaShelf";
const CONFIG_FILE: &str = "config.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "mediashelf", APP_NAME)
}

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    project_dirs().map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory, home of the catalogs.
pub fn get_data_directory() -> Option<PathBuf> {
    project_dirs().map(|proj_dirs| proj_dirs.data_dir().to_path_buf())
}

/// Returns the full path to the configuration file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the configuration from `path`, or from the platform config file.
///
/// A missing file is created with defaults. A file that cannot be parsed is
/// migrated field by field, and failing that replaced by defaults in memory.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_path(path)?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            migrate_legacy_config(&config_content).or_else(|_| Ok(AppConfig::default()))
        }
    }
}

/// Fills in fields that older config files lack or left `null`.
fn migrate_legacy_config(config_content: &str) -> Result<AppConfig> {
    let mut value: Value = serde_json::from_str(config_content)?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Config is not a JSON object"))?;

    let defaults = AppConfig::default();

    let ensure_field = |obj: &mut serde_json::Map<String, Value>, key: &str, default_val: Value| {
        if !obj.contains_key(key) || obj.get(key) == Some(&Value::Null) {
            obj.insert(key.to_string(), default_val);
        }
    };

    if !obj.contains_key("catalog_directory") {
        obj.insert("catalog_directory".to_string(), Value::Null);
    }
    ensure_field(
        obj,
        "audit_concurrency",
        serde_json::to_value(defaults.audit_concurrency)?,
    );
    ensure_field(
        obj,
        "notify_missing_files",
        Value::Bool(defaults.notify_missing_files),
    );

    if !obj.get("archive").is_some_and(Value::is_object) {
        obj.insert(
            "archive".to_string(),
            serde_json::to_value(ArchiveSettings::default())?,
        );
    }
    if let Some(archive) = obj.get_mut("archive").and_then(Value::as_object_mut) {
        let archive_defaults = ArchiveSettings::default();
        if !archive.contains_key("process_timeout_secs") {
            archive.insert(
                "process_timeout_secs".to_string(),
                serde_json::to_value(archive_defaults.process_timeout_secs)?,
            );
        }
        ensure_field(
            archive,
            "registry_timeout_ms",
            serde_json::to_value(archive_defaults.registry_timeout_ms)?,
        );
        ensure_field(
            archive,
            "output_cap_bytes",
            serde_json::to_value(archive_defaults.output_cap_bytes)?,
        );
    }

    let migrated_config: AppConfig = serde_json::from_value(Value::Object(obj.clone()))?;
    tracing::info!("Successfully migrated legacy config");
    Ok(migrated_config)
}

/// Saves the configuration to `path`, or to the platform config file.
pub fn save_config(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

/// Exports the current configuration to a user-specified JSON file.
pub fn export_config(config: &AppConfig, export_path: &Path) -> Result<()> {
    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(export_path, config_json)?;
    tracing::info!("Exported config to {:?}", export_path);
    Ok(())
}

/// Imports an application configuration from a user-specified JSON file.
pub fn import_config(import_path: &Path) -> Result<AppConfig> {
    let config_content = fs::read_to_string(import_path)?;
    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Imported config from {:?}", import_path);
            Ok(config)
        }
        Err(_) => {
            tracing::info!("Importing legacy config format from {:?}", import_path);
            migrate_legacy_config(&config_content)
        }
    }
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.mediashelf.MediaShelf/
// Linux:   ~/.config/mediashelf/
// Windows: %APPDATA%/mediashelf/MediaShelf/config/
