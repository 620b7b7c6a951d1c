//! The application layer: owns the catalogs and answers UI commands.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod messages;
pub mod proxy;
pub mod state;

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::archive::{platform_locator, ArchiveProcessRunner, TokioProcessExecutor, ToolKind, ToolLocator};
use crate::config::AppConfig;
use crate::core::{
    CatalogStore, ExistsProbe, FileSystem, JsonCatalogStore, RawDroppedFile, ResourceKind,
    TokioFileSystem,
};
use events::{IpcMessage, ToastLevel, UserEvent};
use proxy::EventProxy;
use state::AppState;

/// The collaborators every command handler works through.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn CatalogStore>,
    pub fs: Arc<dyn FileSystem>,
    pub probe: Arc<dyn ExistsProbe>,
    pub locator: Arc<dyn ToolLocator>,
    pub archive: Arc<ArchiveProcessRunner>,
}

impl Services {
    /// Real filesystem, JSON catalogs and the platform's tool locator.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let catalog_dir = config
            .catalog_directory()
            .ok_or_else(|| anyhow::anyhow!("Could not determine catalog directory"))?;
        tracing::info!("Catalogs live in {:?}", catalog_dir);

        let fs: Arc<dyn FileSystem> = Arc::new(TokioFileSystem);
        let locator = platform_locator(config.registry_timeout());
        let executor = Arc::new(TokioProcessExecutor::new(
            config.process_timeout(),
            config.archive.output_cap_bytes,
        ));

        Ok(Self {
            store: Arc::new(JsonCatalogStore::new(catalog_dir)),
            fs: fs.clone(),
            probe: Arc::new(TokioFileSystem),
            locator: locator.clone(),
            archive: Arc::new(ArchiveProcessRunner::new(locator, executor, fs)),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KindPayload {
    kind: ResourceKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropPayload {
    kind: ResourceKind,
    files: Vec<RawDroppedFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayload {
    kind: ResourceKind,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingPayload {
    kind: ResourceKind,
    id: String,
    rating: Option<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathPayload {
    kind: ResourceKind,
    id: String,
    new_path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompressPayload {
    source: PathBuf,
    archive: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractPayload {
    archive: PathBuf,
    output_dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolPayload {
    tool: ToolKind,
}

fn parse<T: serde::de::DeserializeOwned, P: EventProxy>(
    command: &str,
    payload: serde_json::Value,
    proxy: &P,
) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::error!("Invalid payload for '{}': {}", command, e);
            proxy.send_event(UserEvent::toast(
                ToastLevel::Error,
                "Invalid request",
                format!("{command}: {e}"),
            ));
            None
        }
    }
}

/// Parses one IPC message from the WebView and runs its handler on the
/// tokio runtime. Must be called from within a runtime context.
pub fn handle_ipc_message<P: EventProxy>(
    message: String,
    services: Services,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let msg: IpcMessage = match serde_json::from_str(&message) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::error!("Failed to parse IPC message: {}", e);
            return;
        }
    };
    tracing::debug!("IPC command '{}'", msg.command);

    let IpcMessage { command, payload } = msg;
    match command.as_str() {
        "loadCatalogs" => {
            tokio::spawn(async move {
                commands::load_catalogs(&services, &proxy, &state).await;
            });
        }
        "dropFiles" => {
            if let Some(p) = parse::<DropPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::handle_drop(p.kind, p.files, &services, &proxy, &state).await;
                });
            }
        }
        "confirmPathUpdate" => {
            tokio::spawn(async move {
                commands::confirm_path_update(&services, &proxy, &state).await;
            });
        }
        "declinePathUpdate" => {
            tokio::spawn(async move {
                commands::decline_path_update(&services, &proxy, &state).await;
            });
        }
        "checkFileExistence" => {
            if let Some(p) = parse::<KindPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::check_file_existence(p.kind, &services, &proxy, &state).await;
                });
            }
        }
        "deleteRecord" => {
            if let Some(p) = parse::<RecordPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::delete_record(p.kind, &p.id, &services, &proxy, &state).await;
                });
            }
        }
        "toggleFavorite" => {
            if let Some(p) = parse::<RecordPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::toggle_favorite(p.kind, &p.id, &services, &proxy, &state).await;
                });
            }
        }
        "setRating" => {
            if let Some(p) = parse::<RatingPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::set_rating(p.kind, &p.id, p.rating, &services, &proxy, &state)
                        .await;
                });
            }
        }
        "updatePath" => {
            if let Some(p) = parse::<PathPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::update_path(p.kind, &p.id, &p.new_path, &services, &proxy, &state)
                        .await;
                });
            }
        }
        "compress" => {
            if let Some(p) = parse::<CompressPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::compress(&p.source, &p.archive, &services, &proxy).await;
                });
            }
        }
        "extract" => {
            if let Some(p) = parse::<ExtractPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::extract(&p.archive, &p.output_dir, &services, &proxy).await;
                });
            }
        }
        "locateTool" => {
            if let Some(p) = parse::<ToolPayload, _>(&command, payload, &proxy) {
                tokio::spawn(async move {
                    commands::locate_tool(p.tool, services.locator.as_ref(), &proxy).await;
                });
            }
        }
        other => {
            tracing::warn!("Unknown IPC command: {}", other);
        }
    }
}
