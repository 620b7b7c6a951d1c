//! Classifies a path as archive, single media file, or folder.

use super::{ResourceKind, UnitKind};
use crate::utils::file_detection::{is_archive_file, is_media_file};
use crate::utils::paths;

/// Extension-based classifier for one resource kind's media whitelist.
///
/// Never fails: anything that is neither an archive nor a whitelisted media
/// file is treated as a folder.
#[derive(Debug, Clone, Copy)]
pub struct PathClassifier {
    kind: ResourceKind,
}

impl PathClassifier {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.kind
    }

    /// Classifies `path`. When `declared_name` is given it is checked in
    /// preference to the path's own last component.
    pub fn classify(&self, path: &str, declared_name: Option<&str>) -> UnitKind {
        let name = declared_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| paths::file_name(path));

        if is_archive_file(name) || is_archive_file(path) {
            UnitKind::Archive
        } else if is_media_file(name, self.kind) {
            UnitKind::SingleFile
        } else {
            UnitKind::Folder
        }
    }

    /// The display name a unit of the given classification gets: media files
    /// lose their extension, archives and folders keep their full name.
    pub fn logical_name(&self, name: &str, kind: UnitKind) -> String {
        match kind {
            UnitKind::SingleFile => paths::strip_extension(name).to_string(),
            UnitKind::Archive | UnitKind::Folder => name.to_string(),
        }
    }
}
