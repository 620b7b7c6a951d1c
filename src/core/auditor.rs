//! Refreshes the `file_exists` flag of every record in a catalog.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::io;

use super::Catalog;

/// The "does this path exist" collaborator consulted for each record.
#[async_trait]
pub trait ExistsProbe: Send + Sync {
    async fn exists(&self, path: &str) -> io::Result<bool>;
}

/// Why a record was counted as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "detail")]
pub enum MissingReason {
    EmptyPath,
    NotFound,
    ProbeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingEntry {
    pub id: String,
    pub name: String,
    pub path: String,
    pub reason: MissingReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Records whose path was actually probed.
    pub checked: usize,
    pub missing_count: usize,
    pub missing: Vec<MissingEntry>,
}

/// Walks a catalog and probes every record's path.
///
/// Probe failures never escape: the record is marked missing and the audit
/// moves on. With a concurrency above one, probes overlap but results are
/// still applied in catalog order.
#[derive(Debug, Clone, Copy)]
pub struct ExistenceAuditor {
    concurrency: usize,
}

impl Default for ExistenceAuditor {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl ExistenceAuditor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub async fn audit<P>(&self, catalog: &mut Catalog, probe: &P) -> AuditReport
    where
        P: ExistsProbe + ?Sized,
    {
        tracing::info!(
            "Starting existence audit of {} {} records",
            catalog.len(),
            catalog.kind()
        );

        let paths: Vec<String> = catalog
            .records()
            .iter()
            .map(|r| r.file_path.clone())
            .collect();

        let outcomes: Vec<Result<bool, MissingReason>> = stream::iter(paths)
            .map(|path| async move {
                if path.trim().is_empty() {
                    return Err(MissingReason::EmptyPath);
                }
                match probe.exists(&path).await {
                    Ok(true) => Ok(true),
                    Ok(false) => Err(MissingReason::NotFound),
                    Err(e) => {
                        tracing::warn!("Existence probe failed for {}: {}", path, e);
                        Err(MissingReason::ProbeFailed(e.to_string()))
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = AuditReport::default();
        for (record, outcome) in catalog.records_mut().iter_mut().zip(outcomes) {
            if !matches!(outcome, Err(MissingReason::EmptyPath)) {
                report.checked += 1;
            }
            match outcome {
                Ok(_) => record.file_exists = true,
                Err(reason) => {
                    record.file_exists = false;
                    tracing::debug!("Missing: {} ({})", record.name, record.file_path);
                    report.missing.push(MissingEntry {
                        id: record.id.clone(),
                        name: record.name.clone(),
                        path: record.file_path.clone(),
                        reason,
                    });
                }
            }
        }
        report.missing_count = report.missing.len();

        tracing::info!(
            "Existence audit finished: checked {}, {} missing",
            report.checked,
            report.missing_count
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResourceKind, ResourceRecord};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct MapProbe {
        answers: HashMap<String, io::Result<bool>>,
        calls: AtomicUsize,
    }

    impl MapProbe {
        fn with(mut self, path: &str, answer: io::Result<bool>) -> Self {
            self.answers.insert(path.to_string(), answer);
            self
        }
    }

    #[async_trait]
    impl ExistsProbe for MapProbe {
        async fn exists(&self, path: &str) -> io::Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Stagger completion so buffered ordering is actually exercised.
            let delay = 5 * (path.len() % 3) as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            match self.answers.get(path) {
                Some(Ok(v)) => Ok(*v),
                Some(Err(e)) => Err(io::Error::new(e.kind(), e.to_string())),
                None => Ok(false),
            }
        }
    }

    fn catalog(paths: &[&str]) -> Catalog {
        let records = paths
            .iter()
            .enumerate()
            .map(|(i, p)| ResourceRecord::new(format!("r{i}"), *p))
            .collect();
        Catalog::from_records(ResourceKind::Audio, records)
    }

    #[tokio::test]
    async fn refreshes_flags_and_counts_missing() {
        let mut catalog = catalog(&["/a.mp3", "/b.mp3", ""]);
        let probe = MapProbe::default()
            .with("/a.mp3", Ok(true))
            .with("/b.mp3", Ok(false));

        let report = ExistenceAuditor::default().audit(&mut catalog, &probe).await;

        let flags: Vec<bool> = catalog.records().iter().map(|r| r.file_exists).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(report.checked, 2);
        assert_eq!(report.missing_count, 2);
        assert_eq!(report.missing[0].reason, MissingReason::NotFound);
        assert_eq!(report.missing[1].reason, MissingReason::EmptyPath);
        // The empty path is never handed to the probe.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn probe_error_marks_record_missing_and_audit_continues() {
        let mut catalog = catalog(&["/one.mp3", "/two.mp3", "/three.mp3", "/four.mp3"]);
        let probe = MapProbe::default()
            .with("/one.mp3", Ok(true))
            .with(
                "/two.mp3",
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            )
            .with("/three.mp3", Ok(true))
            .with("/four.mp3", Ok(true));

        let report = ExistenceAuditor::default().audit(&mut catalog, &probe).await;

        assert_eq!(catalog.len(), 4);
        let flags: Vec<bool> = catalog.records().iter().map(|r| r.file_exists).collect();
        assert_eq!(flags, vec![true, false, true, true]);
        assert_eq!(report.missing_count, 1);
        assert!(matches!(report.missing[0].reason, MissingReason::ProbeFailed(_)));
        assert!(logs_contain("Existence probe failed for /two.mp3"));
    }

    #[tokio::test]
    async fn concurrent_audit_keeps_catalog_order() {
        let paths = ["/x", "/yy", "/zzz", "/wwww", "/vvvvv"];
        let mut catalog = catalog(&paths);
        let probe = MapProbe::default()
            .with("/x", Ok(true))
            .with("/yy", Ok(false))
            .with("/zzz", Ok(true))
            .with("/wwww", Ok(false))
            .with("/vvvvv", Ok(true));

        let report = ExistenceAuditor::new(4).audit(&mut catalog, &probe).await;

        let flags: Vec<bool> = catalog.records().iter().map(|r| r.file_exists).collect();
        assert_eq!(flags, vec![true, false, true, false, true]);
        let missing: Vec<&str> = report.missing.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(missing, vec!["/yy", "/wwww"]);
    }

    #[tokio::test]
    async fn re_auditing_is_idempotent() {
        let mut catalog = catalog(&["/a", "/b"]);
        let probe = MapProbe::default().with("/a", Ok(true));
        let auditor = ExistenceAuditor::new(0);

        let first = auditor.audit(&mut catalog, &probe).await;
        let snapshot = catalog.records().to_vec();
        let second = auditor.audit(&mut catalog, &probe).await;

        assert_eq!(first, second);
        assert_eq!(snapshot, catalog.records());
    }
}
