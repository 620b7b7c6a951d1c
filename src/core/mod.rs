pub mod auditor;
pub mod catalog;
pub mod classifier;
pub mod detector;
pub mod error;
pub mod fs;
pub mod reconciler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::paths;

/// The resource kinds the library manages. Each kind owns one catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Game,
    Image,
    Video,
    Audio,
    Novel,
    Website,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Game,
        ResourceKind::Image,
        ResourceKind::Video,
        ResourceKind::Audio,
        ResourceKind::Novel,
        ResourceKind::Website,
    ];

    /// The key under which the catalog of this kind is persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Game => "games",
            ResourceKind::Image => "images",
            ResourceKind::Video => "videos",
            ResourceKind::Audio => "audios",
            ResourceKind::Novel => "novels",
            ResourceKind::Website => "websites",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a dropped entry turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    SingleFile,
    Folder,
    Archive,
}

/// One raw entry of a drop event, as reported by the web view.
///
/// Every field except `name` is optional because browsers and shells
/// disagree on what they populate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDroppedFile {
    /// The entry's own name (no directories).
    pub name: String,
    /// Absolute path on disk, when the host exposes it.
    pub path: Option<String>,
    /// Path relative to the dropped folder root (`webkitRelativePath`).
    pub relative_path: Option<String>,
    /// Declared MIME type; empty or absent for directories.
    pub mime_type: Option<String>,
    /// Explicit directory flag from a file-system entry, when available.
    pub is_directory: Option<bool>,
}

impl RawDroppedFile {
    /// Builds an entry from an absolute path, deriving the name from it.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: paths::file_name(&path).to_string(),
            path: Some(path),
            ..Default::default()
        }
    }

    pub fn with_relative_path(mut self, relative: impl Into<String>) -> Self {
        self.relative_path = Some(relative.into());
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn as_directory(mut self) -> Self {
        self.is_directory = Some(true);
        self
    }

    fn has_type_hint(&self) -> bool {
        self.mime_type.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// A logical item detected in a drop event, prior to catalog insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionUnit {
    pub path: String,
    pub logical_name: String,
    pub kind: UnitKind,
    pub source_files: Vec<RawDroppedFile>,
}

/// A persisted catalog entry.
///
/// Type-specific fields that the pipeline does not interpret (duration,
/// artist, play counts, ...) are carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    #[serde(alias = "folderPath", alias = "executablePath", alias = "url")]
    pub file_path: String,
    #[serde(default = "default_true")]
    pub file_exists: bool,
    pub added_date: DateTime<Utc>,
    #[serde(default)]
    pub is_archive: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl ResourceRecord {
    /// Creates a fresh record with a generated id and the current timestamp.
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            file_path: file_path.into(),
            file_exists: true,
            added_date: Utc::now(),
            is_archive: false,
            tags: Vec::new(),
            rating: None,
            is_favorite: false,
            extra: serde_json::Map::new(),
        }
    }
}

/// Why a unit was refused outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    EmptyPath,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyPath => f.write_str("path is empty"),
        }
    }
}

/// The result of comparing one ingestion unit against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupOutcome {
    Accepted(IngestionUnit),
    SkippedExactDuplicate {
        unit: IngestionUnit,
        existing_id: String,
    },
    PathUpdateCandidate {
        unit: IngestionUnit,
        existing_id: String,
        new_path: String,
    },
    Rejected {
        unit: IngestionUnit,
        reason: RejectReason,
    },
}

impl DedupOutcome {
    pub fn unit(&self) -> &IngestionUnit {
        match self {
            DedupOutcome::Accepted(unit)
            | DedupOutcome::SkippedExactDuplicate { unit, .. }
            | DedupOutcome::PathUpdateCandidate { unit, .. }
            | DedupOutcome::Rejected { unit, .. } => unit,
        }
    }

    pub fn is_path_update(&self) -> bool {
        matches!(self, DedupOutcome::PathUpdateCandidate { .. })
    }
}

pub use auditor::{AuditReport, ExistenceAuditor, ExistsProbe, MissingEntry};
pub use catalog::{Catalog, CatalogStore, JsonCatalogStore};
pub use classifier::PathClassifier;
pub use detector::DropIngestDetector;
pub use error::{CoreError, CoreResult};
pub use fs::{FileSystem, TokioFileSystem};
pub use reconciler::{DedupReconciler, RecordFactory};
