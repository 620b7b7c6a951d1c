//! Contains helper functions to reduce boilerplate code in other `app` modules.

use std::sync::{Arc, Mutex};

use super::events::{ToastLevel, UserEvent};
use super::messages;
use super::proxy::EventProxy;
use super::state::AppState;
use crate::core::{Catalog, CatalogStore, CoreResult, ResourceKind, ResourceRecord};

/// Locks the `AppState`, runs `update_fn` on one catalog and, if it succeeded,
/// sends a `CatalogChanged` event.
pub fn with_catalog_and_notify<F, R, P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    kind: ResourceKind,
    update_fn: F,
) -> CoreResult<R>
where
    F: FnOnce(&mut Catalog) -> CoreResult<R>,
{
    let mut state_guard = state
        .lock()
        .expect("Mutex was poisoned. This should not happen.");

    let catalog = state_guard.catalog_mut(kind);
    let value = update_fn(catalog)?;
    let records = catalog.records().to_vec();

    proxy.send_event(UserEvent::CatalogChanged { kind, records });
    Ok(value)
}

/// Writes the current catalog of `kind` through the store. Failures become an
/// error toast; the in-memory catalog stays as it is.
///
/// Saves of one kind run one at a time and each takes its snapshot only once
/// it holds the save lock, so the last save always writes the latest catalog.
pub async fn persist<P: EventProxy>(
    store: &dyn CatalogStore,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
    kind: ResourceKind,
) -> bool {
    let save_lock = state
        .lock()
        .expect("Mutex was poisoned. This should not happen.")
        .save_lock(kind);
    let _guard = save_lock.lock().await;

    let records: Vec<ResourceRecord> = state
        .lock()
        .expect("Mutex was poisoned. This should not happen.")
        .catalogs
        .get(&kind)
        .map(|catalog| catalog.records().to_vec())
        .unwrap_or_default();
    match store.save(kind, &records).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to save {} catalog: {}", kind, e);
            proxy.send_event(UserEvent::toast(
                ToastLevel::Error,
                "Save failed",
                messages::describe(&e),
            ));
            false
        }
    }
}
