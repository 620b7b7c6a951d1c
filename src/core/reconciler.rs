//! Deduplicates ingestion units against a catalog and turns accepted units
//! into records.

use serde_json::json;
use std::path::Path;

use super::{
    Catalog, CoreError, CoreResult, DedupOutcome, FileSystem, IngestionUnit, RejectReason,
    ResourceKind, ResourceRecord, UnitKind,
};
use crate::utils::paths::{file_name, same_file_name};

/// Compares units one at a time against the catalog as it was when the batch
/// started. Units accepted earlier in the same batch are not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupReconciler;

impl DedupReconciler {
    /// Produces one outcome per unit, in unit order, stopping right after the
    /// first [`DedupOutcome::PathUpdateCandidate`]. The caller resumes with
    /// `&units[outcomes.len()..]` once the user has answered.
    pub fn reconcile(&self, units: &[IngestionUnit], catalog: &Catalog) -> Vec<DedupOutcome> {
        let mut outcomes = Vec::with_capacity(units.len());

        for (i, unit) in units.iter().enumerate() {
            let outcome = self.reconcile_unit(unit, catalog);
            tracing::debug!(
                "Unit {}/{} {} -> {}",
                i + 1,
                units.len(),
                unit.path,
                outcome_label(&outcome)
            );
            let halt = outcome.is_path_update();
            outcomes.push(outcome);
            if halt {
                tracing::info!(
                    "Path update candidate for {}; halting batch with {} units left",
                    unit.path,
                    units.len() - i - 1
                );
                break;
            }
        }

        outcomes
    }

    fn reconcile_unit(&self, unit: &IngestionUnit, catalog: &Catalog) -> DedupOutcome {
        if unit.path.trim().is_empty() {
            return DedupOutcome::Rejected {
                unit: unit.clone(),
                reason: RejectReason::EmptyPath,
            };
        }

        if let Some(existing) = catalog.find_by_path(&unit.path) {
            tracing::info!("{} is already in the catalog, skipping", unit.path);
            return DedupOutcome::SkippedExactDuplicate {
                unit: unit.clone(),
                existing_id: existing.id.clone(),
            };
        }

        let moved = catalog
            .records()
            .iter()
            .find(|r| !r.file_exists && same_file_name(&r.file_path, &unit.path));
        if let Some(existing) = moved {
            tracing::info!(
                "{} matches missing record {} at {}",
                file_name(&unit.path),
                existing.name,
                existing.file_path
            );
            return DedupOutcome::PathUpdateCandidate {
                unit: unit.clone(),
                existing_id: existing.id.clone(),
                new_path: unit.path.clone(),
            };
        }

        DedupOutcome::Accepted(unit.clone())
    }
}

fn outcome_label(outcome: &DedupOutcome) -> &'static str {
    match outcome {
        DedupOutcome::Accepted(_) => "accepted",
        DedupOutcome::SkippedExactDuplicate { .. } => "duplicate",
        DedupOutcome::PathUpdateCandidate { .. } => "path update",
        DedupOutcome::Rejected { .. } => "rejected",
    }
}

/// Builds catalog records from accepted units.
#[derive(Debug, Clone, Copy)]
pub struct RecordFactory {
    kind: ResourceKind,
}

impl RecordFactory {
    pub fn new(kind: ResourceKind) -> Self {
        Self { kind }
    }

    /// Creates the record for `unit`. Image folders are scanned for pages,
    /// which is the only step that touches the filesystem and can fail.
    pub async fn materialize<F>(&self, unit: &IngestionUnit, fs: &F) -> CoreResult<ResourceRecord>
    where
        F: FileSystem + ?Sized,
    {
        let mut record = ResourceRecord::new(unit.logical_name.clone(), unit.path.clone());
        record.is_archive = unit.kind == UnitKind::Archive;

        if self.kind == ResourceKind::Image {
            match unit.kind {
                UnitKind::Folder => {
                    let pages = fs
                        .list_image_files(Path::new(&unit.path))
                        .await
                        .map_err(|e| CoreError::io(e, &unit.path))?;
                    let cover = pages
                        .first()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    record.extra.insert("pagesCount".into(), json!(pages.len()));
                    record.extra.insert("cover".into(), json!(cover));
                }
                UnitKind::SingleFile => {
                    record.extra.insert("pagesCount".into(), json!(1));
                    record.extra.insert("cover".into(), json!(unit.path));
                }
                UnitKind::Archive => {
                    record.extra.insert("pagesCount".into(), json!(0));
                }
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RawDroppedFile, TokioFileSystem};
    use std::fs;
    use tempfile::tempdir;

    fn unit(path: &str, kind: UnitKind) -> IngestionUnit {
        IngestionUnit {
            path: path.to_string(),
            logical_name: file_name(path).to_string(),
            kind,
            source_files: vec![RawDroppedFile::from_path(path)],
        }
    }

    fn record(path: &str, exists: bool) -> ResourceRecord {
        let mut r = ResourceRecord::new(file_name(path), path);
        r.file_exists = exists;
        r
    }

    #[test]
    fn exact_path_is_skipped_never_accepted() {
        let catalog = Catalog::from_records(ResourceKind::Image, vec![record("C:/a.png", true)]);
        let units = [unit("C:/a.png", UnitKind::SingleFile), unit("C:/b.png", UnitKind::SingleFile)];

        let outcomes = DedupReconciler.reconcile(&units, &catalog);

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            &outcomes[0],
            DedupOutcome::SkippedExactDuplicate { existing_id, .. } if *existing_id == catalog.records()[0].id
        ));
        assert!(matches!(&outcomes[1], DedupOutcome::Accepted(u) if u.path == "C:/b.png"));
    }

    #[test]
    fn exact_match_even_when_record_is_missing() {
        let catalog = Catalog::from_records(ResourceKind::Audio, vec![record("/m/song.mp3", false)]);
        let outcomes = DedupReconciler.reconcile(&[unit("/m/song.mp3", UnitKind::SingleFile)], &catalog);
        assert!(matches!(outcomes[0], DedupOutcome::SkippedExactDuplicate { .. }));
    }

    #[test]
    fn same_name_missing_record_halts_batch() {
        let catalog = Catalog::from_records(ResourceKind::Audio, vec![record("A:/old/Song.MP3", false)]);
        let units = [
            unit("B:/new/first.mp3", UnitKind::SingleFile),
            unit("B:\\new\\song.mp3", UnitKind::SingleFile),
            unit("B:/new/third.mp3", UnitKind::SingleFile),
            unit("B:/new/fourth.mp3", UnitKind::SingleFile),
        ];

        let outcomes = DedupReconciler.reconcile(&units, &catalog);

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], DedupOutcome::Accepted(_)));
        match &outcomes[1] {
            DedupOutcome::PathUpdateCandidate {
                existing_id,
                new_path,
                ..
            } => {
                assert_eq!(existing_id, &catalog.records()[0].id);
                assert_eq!(new_path, "B:\\new\\song.mp3");
            }
            other => panic!("expected path update candidate, got {other:?}"),
        }
        assert_eq!(units[outcomes.len()..].len(), 2);
    }

    #[test]
    fn same_name_present_record_is_accepted() {
        let catalog = Catalog::from_records(ResourceKind::Audio, vec![record("A:/old/song.mp3", true)]);
        let outcomes = DedupReconciler.reconcile(&[unit("B:/song.mp3", UnitKind::SingleFile)], &catalog);
        assert!(matches!(outcomes[0], DedupOutcome::Accepted(_)));
    }

    #[test]
    fn batch_checks_only_the_starting_snapshot() {
        let catalog = Catalog::new(ResourceKind::Video);
        let units = [unit("C:/v.mp4", UnitKind::SingleFile), unit("C:/v.mp4", UnitKind::SingleFile)];
        let outcomes = DedupReconciler.reconcile(&units, &catalog);
        assert!(outcomes.iter().all(|o| matches!(o, DedupOutcome::Accepted(_))));
    }

    #[test]
    fn empty_path_is_rejected() {
        let catalog = Catalog::new(ResourceKind::Image);
        let outcomes = DedupReconciler.reconcile(&[unit("  ", UnitKind::Folder)], &catalog);
        assert!(matches!(
            outcomes[0],
            DedupOutcome::Rejected {
                reason: RejectReason::EmptyPath,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn image_folder_records_count_pages() {
        let dir = tempdir().unwrap();
        let album = dir.path().join("Album");
        fs::create_dir_all(album.join("sub")).unwrap();
        fs::write(album.join("01.png"), b"x").unwrap();
        fs::write(album.join("sub/02.jpg"), b"x").unwrap();
        let album_path = album.to_string_lossy().into_owned();

        let record = RecordFactory::new(ResourceKind::Image)
            .materialize(&unit(&album_path, UnitKind::Folder), &TokioFileSystem)
            .await
            .unwrap();

        assert_eq!(record.name, "Album");
        assert!(record.file_exists);
        assert!(!record.is_archive);
        assert_eq!(record.extra["pagesCount"], json!(2));
        assert!(record.extra["cover"].as_str().unwrap().ends_with("01.png"));
    }

    #[tokio::test]
    async fn missing_image_folder_fails_materialization() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone").to_string_lossy().into_owned();
        let err = RecordFactory::new(ResourceKind::Image)
            .materialize(&unit(&missing, UnitKind::Folder), &TokioFileSystem)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn archive_units_are_flagged() {
        let record = RecordFactory::new(ResourceKind::Video)
            .materialize(&unit("C:/dl/pack.zip", UnitKind::Archive), &TokioFileSystem)
            .await
            .unwrap();
        assert!(record.is_archive);
        assert!(record.extra.is_empty());
        assert_ne!(record.id, "");
    }
}
