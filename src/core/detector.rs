//! Groups the raw entries of a drop event into ingestion units.
//!
//! Four strategies are tried in order and the first one that yields at least
//! one unit wins:
//!
//! 1. relative-path grouping (`webkitRelativePath` style hints),
//! 2. directory entries, recognised by an explicit flag or by having neither a
//!    type hint nor an extension, which also absorb files below them,
//! 3. the single-entry special case, classified by [`PathClassifier`],
//! 4. the multi-entry fallback: every archive, or failing that every media file,
//!    becomes its own unit.
//!
//! Entries no strategy claims are left out of the result without error.

use std::collections::HashMap;

use super::{IngestionUnit, PathClassifier, RawDroppedFile, ResourceKind, UnitKind};
use crate::utils::file_detection::has_extension;
use crate::utils::paths::{file_name, normalize_separators};

/// Ordered collection of units keyed by path, preserving discovery order.
#[derive(Default)]
struct UnitSet {
    units: Vec<IngestionUnit>,
    index: HashMap<String, usize>,
}

impl UnitSet {
    fn add(&mut self, path: String, name: String, kind: UnitKind, file: &RawDroppedFile) {
        match self.index.get(&path) {
            Some(&idx) => self.units[idx].source_files.push(file.clone()),
            None => {
                self.index.insert(path.clone(), self.units.len());
                self.units.push(IngestionUnit {
                    path,
                    logical_name: name,
                    kind,
                    source_files: vec![file.clone()],
                });
            }
        }
    }

    fn into_units(self) -> Vec<IngestionUnit> {
        self.units
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DropIngestDetector {
    classifier: PathClassifier,
}

impl DropIngestDetector {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            classifier: PathClassifier::new(kind),
        }
    }

    pub fn detect(&self, entries: &[RawDroppedFile]) -> Vec<IngestionUnit> {
        if entries.is_empty() {
            return Vec::new();
        }
        tracing::info!(
            "Detecting ingestion units in {} dropped entries ({})",
            entries.len(),
            self.classifier.resource_kind()
        );

        let units = self.group_by_relative_path(entries);
        if !units.is_empty() {
            tracing::info!("Relative-path grouping produced {} units", units.len());
            return units;
        }

        let units = self.detect_directory_entries(entries);
        if !units.is_empty() {
            tracing::info!("Directory-entry detection produced {} units", units.len());
            return units;
        }

        if let [single] = entries {
            let units: Vec<_> = self.classify_single(single).into_iter().collect();
            tracing::info!("Single-entry classification produced {} units", units.len());
            return units;
        }

        let units = self.multi_entry_fallback(entries);
        tracing::info!("Multi-entry fallback produced {} units", units.len());
        units
    }

    /// Strategy 1: entries whose relative path contains a separator are grouped
    /// under their first path segment.
    fn group_by_relative_path(&self, entries: &[RawDroppedFile]) -> Vec<IngestionUnit> {
        let mut set = UnitSet::default();

        for entry in entries {
            let Some(relative) = entry.relative_path.as_deref() else {
                continue;
            };
            let relative = normalize_separators(relative);
            if !relative.contains('/') {
                continue;
            }
            let folder_name = match relative.split('/').next() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };

            let absolute = entry.path.as_deref().map(normalize_separators).unwrap_or_default();
            let base = absolute
                .strip_suffix(relative.as_str())
                .map(|b| b.trim_end_matches('/'))
                .unwrap_or("");
            let folder_path = if base.is_empty() {
                folder_name.clone()
            } else {
                format!("{base}/{folder_name}")
            };

            tracing::debug!("Entry {} belongs to folder {}", entry.name, folder_path);
            set.add(folder_path, folder_name, UnitKind::Folder, entry);
        }

        set.into_units()
    }

    /// Strategy 2: directory-looking entries become folder units; remaining
    /// entries located below one of them join that unit.
    fn detect_directory_entries(&self, entries: &[RawDroppedFile]) -> Vec<IngestionUnit> {
        let mut set = UnitSet::default();
        let mut leftovers = Vec::new();

        for entry in entries {
            let Some(path) = entry.path.as_deref().filter(|p| !p.is_empty()) else {
                continue;
            };
            let looks_like_dir = match entry.is_directory {
                Some(flag) => flag,
                None => !entry.has_type_hint() && !has_extension(&entry.name),
            };
            if looks_like_dir {
                let name = if entry.name.is_empty() {
                    file_name(path).to_string()
                } else {
                    entry.name.clone()
                };
                tracing::debug!("Entry {} looks like a directory", path);
                set.add(normalize_separators(path), name, UnitKind::Folder, entry);
            } else {
                leftovers.push((normalize_separators(path), entry));
            }
        }

        if set.units.is_empty() {
            return Vec::new();
        }

        for (path, entry) in leftovers {
            let owner = set
                .units
                .iter_mut()
                .find(|unit| path.starts_with(&format!("{}/", unit.path)));
            if let Some(unit) = owner {
                unit.source_files.push(entry.clone());
            }
        }

        set.into_units()
    }

    /// Strategy 3: a lone entry is classified by its name and path.
    fn classify_single(&self, entry: &RawDroppedFile) -> Option<IngestionUnit> {
        let path = entry.path.as_deref().filter(|p| !p.is_empty())?;
        let name = if entry.name.is_empty() {
            file_name(path)
        } else {
            entry.name.as_str()
        };
        let kind = self.classifier.classify(path, Some(name));
        Some(IngestionUnit {
            path: path.to_string(),
            logical_name: self.classifier.logical_name(name, kind),
            kind,
            source_files: vec![entry.clone()],
        })
    }

    /// Strategy 4: archives each become a unit; without archives, each
    /// recognised media file does.
    fn multi_entry_fallback(&self, entries: &[RawDroppedFile]) -> Vec<IngestionUnit> {
        let classified: Vec<(&RawDroppedFile, &str, UnitKind)> = entries
            .iter()
            .filter_map(|entry| {
                let path = entry.path.as_deref().filter(|p| !p.is_empty())?;
                Some((entry, path, self.classifier.classify(path, Some(entry.name.as_str()))))
            })
            .collect();

        let wanted = if classified.iter().any(|(_, _, k)| *k == UnitKind::Archive) {
            UnitKind::Archive
        } else {
            UnitKind::SingleFile
        };

        let mut set = UnitSet::default();
        for (entry, path, kind) in classified {
            if kind != wanted {
                tracing::debug!("Excluding {} from the drop ({:?})", path, kind);
                continue;
            }
            let name = if entry.name.is_empty() {
                file_name(path)
            } else {
                entry.name.as_str()
            };
            set.add(
                path.to_string(),
                self.classifier.logical_name(name, kind),
                kind,
                entry,
            );
        }
        set.into_units()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(units: &[IngestionUnit]) -> Vec<(&str, &str, UnitKind)> {
        units
            .iter()
            .map(|u| (u.path.as_str(), u.logical_name.as_str(), u.kind))
            .collect()
    }

    #[test]
    fn empty_drop_yields_nothing() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        assert!(detector.detect(&[]).is_empty());
    }

    #[test]
    fn relative_paths_group_by_first_segment() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let entries = vec![
            RawDroppedFile::from_path("C:\\Comics\\Vol1\\001.png")
                .with_relative_path("Vol1/001.png"),
            RawDroppedFile::from_path("C:\\Comics\\Vol1\\sub\\002.png")
                .with_relative_path("Vol1/sub/002.png"),
            RawDroppedFile::from_path("C:\\Comics\\Vol2\\001.png")
                .with_relative_path("Vol2/001.png"),
        ];

        let units = detector.detect(&entries);
        assert_eq!(
            names(&units),
            vec![
                ("C:/Comics/Vol1", "Vol1", UnitKind::Folder),
                ("C:/Comics/Vol2", "Vol2", UnitKind::Folder),
            ]
        );
        assert_eq!(units[0].source_files.len(), 2);
        assert_eq!(units[1].source_files.len(), 1);
    }

    #[test]
    fn relative_path_without_absolute_path_uses_folder_name() {
        let detector = DropIngestDetector::new(ResourceKind::Video);
        let mut entry = RawDroppedFile::default().with_relative_path("Shows/ep1.mkv");
        entry.name = "ep1.mkv".into();

        let units = detector.detect(&[entry]);
        assert_eq!(names(&units), vec![("Shows", "Shows", UnitKind::Folder)]);
    }

    #[test]
    fn directory_entries_absorb_files_below_them() {
        let detector = DropIngestDetector::new(ResourceKind::Video);
        let entries = vec![
            RawDroppedFile::from_path("/media/Season 1"),
            RawDroppedFile::from_path("/media/Season 1/e01.mkv").with_mime_type("video/x-matroska"),
            RawDroppedFile::from_path("/media/other.mkv").with_mime_type("video/x-matroska"),
        ];

        let units = detector.detect(&entries);
        assert_eq!(
            names(&units),
            vec![("/media/Season 1", "Season 1", UnitKind::Folder)]
        );
        assert_eq!(units[0].source_files.len(), 2);
    }

    #[test]
    fn explicit_directory_flag_overrides_extension_heuristic() {
        let detector = DropIngestDetector::new(ResourceKind::Audio);
        let entries = vec![RawDroppedFile::from_path("D:/Albums/Live.2020").as_directory()];

        let units = detector.detect(&entries);
        assert_eq!(
            names(&units),
            vec![("D:/Albums/Live.2020", "Live.2020", UnitKind::Folder)]
        );
    }

    #[test]
    fn single_archive_becomes_archive_unit() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let units = detector.detect(&[RawDroppedFile::from_path("C:/dl/Chapter 3.rar")]);
        assert_eq!(
            names(&units),
            vec![("C:/dl/Chapter 3.rar", "Chapter 3.rar", UnitKind::Archive)]
        );
    }

    #[test]
    fn single_media_file_loses_extension() {
        let detector = DropIngestDetector::new(ResourceKind::Audio);
        let units = detector.detect(&[RawDroppedFile::from_path("C:/m/song.mp3")]);
        assert_eq!(
            names(&units),
            vec![("C:/m/song.mp3", "song", UnitKind::SingleFile)]
        );
    }

    #[test]
    fn single_unknown_file_is_treated_as_folder() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let units = detector.detect(&[RawDroppedFile::from_path("C:/m/readme.docx")]);
        assert_eq!(
            names(&units),
            vec![("C:/m/readme.docx", "readme.docx", UnitKind::Folder)]
        );
    }

    #[test]
    fn single_entry_without_path_is_excluded() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let entry = RawDroppedFile {
            name: "a.png".into(),
            ..Default::default()
        };
        assert!(detector.detect(&[entry]).is_empty());
    }

    #[test]
    fn multi_drop_prefers_archives_over_media() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let entries = vec![
            RawDroppedFile::from_path("C:/dl/a.zip"),
            RawDroppedFile::from_path("C:/dl/cover.png"),
            RawDroppedFile::from_path("C:/dl/b.7z"),
        ];

        let units = detector.detect(&entries);
        assert_eq!(
            names(&units),
            vec![
                ("C:/dl/a.zip", "a.zip", UnitKind::Archive),
                ("C:/dl/b.7z", "b.7z", UnitKind::Archive),
            ]
        );
    }

    #[test]
    fn multi_drop_of_media_files_keeps_order_and_excludes_others() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let entries = vec![
            RawDroppedFile::from_path("C:/b.png"),
            RawDroppedFile::from_path("C:/notes.docx"),
            RawDroppedFile::from_path("C:/a.png"),
        ];

        let units = detector.detect(&entries);
        assert_eq!(
            names(&units),
            vec![
                ("C:/b.png", "b", UnitKind::SingleFile),
                ("C:/a.png", "a", UnitKind::SingleFile),
            ]
        );
    }

    #[test]
    fn reclassifying_detected_paths_is_stable() {
        let detector = DropIngestDetector::new(ResourceKind::Image);
        let classifier = PathClassifier::new(ResourceKind::Image);
        let entries = vec![
            RawDroppedFile::from_path("C:/dl/a.zip"),
            RawDroppedFile::from_path("C:/dl/b.tar.xz"),
        ];
        for unit in detector.detect(&entries) {
            assert_eq!(classifier.classify(&unit.path, None), unit.kind);
        }
    }
}
