//! Defines the central, mutable state of the application.

use std::collections::HashMap;
use std::sync::Arc;

use super::events::PathUpdatePrompt;
use crate::config::AppConfig;
use crate::core::{Catalog, IngestionUnit, ResourceKind};

/// Running tally of one drop batch, carried across path-update prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub added: usize,
    pub path_updates: usize,
    pub skipped: usize,
    /// Human-readable reasons for every unit that was not added, duplicates included.
    pub failures: Vec<String>,
}

/// A drop batch halted on a path-update candidate, waiting for the user.
#[derive(Debug, Clone)]
pub struct PendingBatch {
    pub prompt: PathUpdatePrompt,
    /// Units after the candidate, not yet reconciled.
    pub remaining: Vec<IngestionUnit>,
    pub summary: BatchSummary,
}

/// Where the single drop batch slot stands.
#[derive(Debug, Clone, Default)]
pub enum BatchSlot {
    #[default]
    Idle,
    /// A batch is being reconciled or materialized right now.
    Running,
    /// A batch halted on a path-update candidate, waiting for the user.
    Waiting(PendingBatch),
}

impl BatchSlot {
    pub fn is_idle(&self) -> bool {
        matches!(self, BatchSlot::Idle)
    }

    pub fn pending(&self) -> Option<&PendingBatch> {
        match self {
            BatchSlot::Waiting(pending) => Some(pending),
            _ => None,
        }
    }
}

/// Holds the complete, mutable state of the application.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` and is never locked across
/// an `.await`; async work operates on snapshots and writes back afterwards.
pub struct AppState {
    pub config: AppConfig,
    pub catalogs: HashMap<ResourceKind, Catalog>,
    /// At most one drop batch runs or waits for a path-update answer at a time.
    pub batch: BatchSlot,
    /// Held across snapshot and save so the file on disk never falls behind
    /// the catalog in memory.
    save_locks: HashMap<ResourceKind, Arc<tokio::sync::Mutex<()>>>,
}

impl Default for AppState {
    /// Creates a default `AppState` instance, loading the configuration from disk.
    fn default() -> Self {
        Self::with_config(AppConfig::load().unwrap_or_default())
    }
}

impl AppState {
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            catalogs: ResourceKind::ALL
                .into_iter()
                .map(|kind| (kind, Catalog::new(kind)))
                .collect(),
            batch: BatchSlot::Idle,
            save_locks: ResourceKind::ALL
                .into_iter()
                .map(|kind| (kind, Arc::new(tokio::sync::Mutex::new(()))))
                .collect(),
        }
    }

    pub fn save_lock(&mut self, kind: ResourceKind) -> Arc<tokio::sync::Mutex<()>> {
        self.save_locks.entry(kind).or_default().clone()
    }

    pub fn catalog_mut(&mut self, kind: ResourceKind) -> &mut Catalog {
        self.catalogs
            .entry(kind)
            .or_insert_with(|| Catalog::new(kind))
    }

    /// A copy of the catalog as it is right now.
    pub fn snapshot(&self, kind: ResourceKind) -> Catalog {
        self.catalogs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Catalog::new(kind))
    }
}
