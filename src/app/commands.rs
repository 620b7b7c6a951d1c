//! Contains all the command handlers that are callable from the frontend via IPC.
//!
//! Handlers never hold the state lock across an `.await`. Async work runs on
//! snapshots; results are written back under a short lock and then persisted.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::events::{PathUpdatePrompt, ToastLevel, UserEvent};
use super::helpers::{persist, with_catalog_and_notify};
use super::messages;
use super::proxy::EventProxy;
use super::state::{AppState, BatchSlot, BatchSummary, PendingBatch};
use super::Services;
use crate::archive::{ArchiveOperation, ToolKind, ToolLocator};
use crate::core::{
    CoreResult, DedupOutcome, DedupReconciler, DropIngestDetector, ExistenceAuditor,
    IngestionUnit, RawDroppedFile, RecordFactory, ResourceKind,
};

/// Loads every catalog from the store. A catalog that fails to load starts
/// empty and the user is told.
pub async fn load_catalogs<P: EventProxy>(
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    for kind in ResourceKind::ALL {
        let records = match services.store.load(kind).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Failed to load {} catalog: {}", kind, e);
                proxy.send_event(UserEvent::toast(
                    ToastLevel::Error,
                    format!("Could not load {kind}"),
                    messages::describe(&e),
                ));
                Vec::new()
            }
        };
        let result = with_catalog_and_notify(state, proxy, kind, |catalog| {
            *catalog = crate::core::Catalog::from_records(kind, records);
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!("Could not install {} catalog: {}", kind, e);
        }
    }
}

/// Entry point of a drag-and-drop onto a catalog view.
pub async fn handle_drop<P: EventProxy>(
    kind: ResourceKind,
    files: Vec<RawDroppedFile>,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    // Claim the batch slot under the same lock that checks it.
    let claimed = {
        let mut state_guard = state
            .lock()
            .expect("Mutex was poisoned. This should not happen.");
        if state_guard.batch.is_idle() {
            state_guard.batch = BatchSlot::Running;
            true
        } else {
            false
        }
    };
    if !claimed {
        proxy.send_event(UserEvent::toast(
            ToastLevel::Warning,
            "Import in progress",
            "Wait for the current import or answer its relink question first",
        ));
        return;
    }

    let units = DropIngestDetector::new(kind).detect(&files);
    tracing::info!(
        "Drop of {} entries onto {} produced {} units",
        files.len(),
        kind,
        units.len()
    );
    if units.is_empty() {
        release_batch(state);
        proxy.send_event(UserEvent::toast(
            ToastLevel::Info,
            "Nothing to import",
            "No supported files or folders were dropped",
        ));
        return;
    }

    run_batch(kind, units, BatchSummary::default(), services, proxy, state).await;
}

/// Applies the pending path update, then resumes the halted batch.
pub async fn confirm_path_update<P: EventProxy>(
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    let Some(mut pending) = take_pending(state) else {
        tracing::warn!("Path update confirmed but no batch is pending");
        return;
    };
    let prompt = pending.prompt.clone();

    let updated = with_catalog_and_notify(state, proxy, prompt.kind, |catalog| {
        catalog.update_path(&prompt.existing_id, &prompt.new_path)?;
        Ok(())
    });
    match updated {
        Ok(()) => {
            persist(services.store.as_ref(), proxy, state, prompt.kind).await;
            pending.summary.path_updates += 1;
        }
        Err(e) => {
            tracing::error!("Path update of {} failed: {}", prompt.existing_id, e);
            pending.summary.failures.push(messages::describe(&e));
        }
    }

    run_batch(
        prompt.kind,
        pending.remaining,
        pending.summary,
        services,
        proxy,
        state,
    )
    .await;
}

/// Leaves the record alone and resumes the halted batch.
pub async fn decline_path_update<P: EventProxy>(
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    let Some(mut pending) = take_pending(state) else {
        tracing::warn!("Path update declined but no batch is pending");
        return;
    };
    tracing::info!("User declined relinking {}", pending.prompt.existing_name);
    pending
        .summary
        .failures
        .push(format!("{} was not relinked", pending.prompt.existing_name));

    run_batch(
        pending.prompt.kind,
        pending.remaining,
        pending.summary,
        services,
        proxy,
        state,
    )
    .await;
}

/// Takes the waiting batch out of the slot, keeping the slot claimed while
/// the batch resumes.
fn take_pending(state: &Arc<Mutex<AppState>>) -> Option<PendingBatch> {
    let mut state_guard = state
        .lock()
        .expect("Mutex was poisoned. This should not happen.");
    match std::mem::take(&mut state_guard.batch) {
        BatchSlot::Waiting(pending) => {
            state_guard.batch = BatchSlot::Running;
            Some(pending)
        }
        other => {
            state_guard.batch = other;
            None
        }
    }
}

fn release_batch(state: &Arc<Mutex<AppState>>) {
    state
        .lock()
        .expect("Mutex was poisoned. This should not happen.")
        .batch = BatchSlot::Idle;
}

/// Reconciles `units` against the catalog as it is now, inserts what was
/// accepted, and either parks the batch on a path-update candidate or
/// reports the summary.
async fn run_batch<P: EventProxy>(
    kind: ResourceKind,
    units: Vec<IngestionUnit>,
    mut summary: BatchSummary,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    let snapshot = state
        .lock()
        .expect("Mutex was poisoned. This should not happen.")
        .snapshot(kind);

    let outcomes = DedupReconciler.reconcile(&units, &snapshot);
    let factory = RecordFactory::new(kind);
    let mut new_records = Vec::new();
    let mut candidate = None;

    for outcome in &outcomes {
        match outcome {
            DedupOutcome::Accepted(unit) => {
                match factory.materialize(unit, services.fs.as_ref()).await {
                    Ok(record) => new_records.push(record),
                    Err(e) => {
                        tracing::warn!("Could not add {}: {}", unit.path, e);
                        summary
                            .failures
                            .push(format!("{}: {}", unit.logical_name, messages::describe(&e)));
                    }
                }
            }
            DedupOutcome::SkippedExactDuplicate { .. } => {
                summary.skipped += 1;
                summary.failures.extend(messages::outcome_reason(outcome));
            }
            DedupOutcome::Rejected { .. } => {
                summary.failures.extend(messages::outcome_reason(outcome));
            }
            DedupOutcome::PathUpdateCandidate {
                existing_id,
                new_path,
                ..
            } => {
                candidate = Some((existing_id.clone(), new_path.clone()));
            }
        }
    }

    if !new_records.is_empty() {
        let added = new_records.len();
        let inserted = with_catalog_and_notify(state, proxy, kind, |catalog| {
            for record in new_records {
                catalog.insert(record);
            }
            Ok(())
        });
        if inserted.is_ok() {
            persist(services.store.as_ref(), proxy, state, kind).await;
            summary.added += added;
        }
    }

    if let Some((existing_id, new_path)) = candidate {
        let Some(existing) = snapshot.find(&existing_id) else {
            tracing::error!("Path update candidate {} vanished from the catalog", existing_id);
            release_batch(state);
            proxy.send_event(messages::batch_toast(&summary));
            return;
        };
        let prompt = PathUpdatePrompt {
            kind,
            existing_id,
            existing_name: existing.name.clone(),
            old_path: existing.file_path.clone(),
            new_path,
        };
        let remaining = units[outcomes.len()..].to_vec();
        tracing::info!(
            "Waiting for the user on {} ({} units parked)",
            prompt.existing_name,
            remaining.len()
        );
        state
            .lock()
            .expect("Mutex was poisoned. This should not happen.")
            .batch = BatchSlot::Waiting(PendingBatch {
            prompt: prompt.clone(),
            remaining,
            summary,
        });
        proxy.send_event(UserEvent::ShowPathUpdateDialog(prompt));
        return;
    }

    tracing::info!(
        "Batch on {} finished: {} added, {} relinked, {} skipped, {} failed",
        kind,
        summary.added,
        summary.path_updates,
        summary.skipped,
        summary.failures.len()
    );
    release_batch(state);
    proxy.send_event(messages::batch_toast(&summary));
}

/// Refreshes `fileExists` for every record of `kind` and persists the result.
pub async fn check_file_existence<P: EventProxy>(
    kind: ResourceKind,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    let (mut snapshot, concurrency, notify) = {
        let state_guard = state
            .lock()
            .expect("Mutex was poisoned. This should not happen.");
        (
            state_guard.snapshot(kind),
            state_guard.config.audit_concurrency(),
            state_guard.config.notify_missing_files,
        )
    };

    let report = ExistenceAuditor::new(concurrency)
        .audit(&mut snapshot, services.probe.as_ref())
        .await;

    // Records added or removed while the audit ran are left as they are.
    let applied = with_catalog_and_notify(state, proxy, kind, |catalog| {
        for record in catalog.records_mut() {
            if let Some(audited) = snapshot.find(&record.id) {
                record.file_exists = audited.file_exists;
            }
        }
        Ok(())
    });
    if applied.is_ok() {
        persist(services.store.as_ref(), proxy, state, kind).await;
    }

    if notify && report.missing_count > 0 {
        let lines: Vec<String> = report
            .missing
            .iter()
            .map(|m| {
                if m.path.is_empty() {
                    format!("{} (no path)", m.name)
                } else {
                    format!("{} ({})", m.name, m.path)
                }
            })
            .collect();
        proxy.send_event(UserEvent::toast(
            ToastLevel::Warning,
            format!("{} missing {}", report.missing_count, kind),
            lines.join("\n"),
        ));
    }
    proxy.send_event(UserEvent::AuditFinished { kind, report });
}

pub async fn compress<P: EventProxy>(
    source: &Path,
    archive: &Path,
    services: &Services,
    proxy: &P,
) {
    let result = services.archive.compress(source, archive).await;
    report_archive(ArchiveOperation::Compress, result, proxy);
}

pub async fn extract<P: EventProxy>(
    archive: &Path,
    output_dir: &Path,
    services: &Services,
    proxy: &P,
) {
    let result = services.archive.extract(archive, output_dir).await;
    report_archive(ArchiveOperation::Extract, result, proxy);
}

fn report_archive<P: EventProxy>(
    operation: ArchiveOperation,
    result: CoreResult<crate::archive::ProcessResult>,
    proxy: &P,
) {
    match result {
        Ok(result) => {
            proxy.send_event(UserEvent::toast(
                ToastLevel::Success,
                match operation {
                    ArchiveOperation::Compress => "Compressed",
                    ArchiveOperation::Extract => "Extracted",
                },
                result.output_path.display().to_string(),
            ));
            proxy.send_event(UserEvent::ArchiveFinished { operation, result });
        }
        Err(e) => {
            tracing::error!("Archive {} failed: {}", operation, e);
            proxy.send_event(UserEvent::toast(
                ToastLevel::Error,
                match operation {
                    ArchiveOperation::Compress => "Compression failed",
                    ArchiveOperation::Extract => "Extraction failed",
                },
                messages::describe(&e),
            ));
        }
    }
}

/// Answers "is this tool installed".
pub async fn locate_tool<P: EventProxy>(tool: ToolKind, locator: &dyn ToolLocator, proxy: &P) {
    let lookup = locator.locate(tool).await;
    proxy.send_event(UserEvent::ToolStatus { tool, lookup });
}

/// Runs a catalog mutation, persists the result and reports failures.
async fn mutate<P, F>(
    kind: ResourceKind,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
    update_fn: F,
) where
    P: EventProxy,
    F: FnOnce(&mut crate::core::Catalog) -> CoreResult<()>,
{
    match with_catalog_and_notify(state, proxy, kind, update_fn) {
        Ok(()) => {
            persist(services.store.as_ref(), proxy, state, kind).await;
        }
        Err(e) => {
            tracing::warn!("Catalog update on {} failed: {}", kind, e);
            proxy.send_event(UserEvent::toast(
                ToastLevel::Error,
                "Update failed",
                messages::describe(&e),
            ));
        }
    }
}

pub async fn delete_record<P: EventProxy>(
    kind: ResourceKind,
    id: &str,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    mutate(kind, services, proxy, state, |catalog| {
        let removed = catalog.remove(id)?;
        tracing::info!("Deleted {} record {}", kind, removed.name);
        Ok(())
    })
    .await;
}

/// Sets a 1–5 star rating, or clears it with `None`.
pub async fn set_rating<P: EventProxy>(
    kind: ResourceKind,
    id: &str,
    rating: Option<u8>,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    mutate(kind, services, proxy, state, |catalog| match rating {
        Some(stars) => catalog.set_rating(id, stars),
        None => catalog.clear_rating(id),
    })
    .await;
}

pub async fn toggle_favorite<P: EventProxy>(
    kind: ResourceKind,
    id: &str,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    mutate(kind, services, proxy, state, |catalog| {
        catalog.toggle_favorite(id).map(|_| ())
    })
    .await;
}

/// Points a record at a new path chosen by the user, outside of any drop.
pub async fn update_path<P: EventProxy>(
    kind: ResourceKind,
    id: &str,
    new_path: &str,
    services: &Services,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    mutate(kind, services, proxy, state, |catalog| {
        catalog.update_path(id, new_path).map(|_| ())
    })
    .await;
}
