//! Garbage collection for orphaned extents.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ExtentStore, MetadataStore};

/// Outcome of one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Extents present when the pass started.
    pub scanned: usize,
    /// Extents deleted by this pass.
    pub reclaimed: usize,
    /// Unreferenced extents held back until the next pass.
    pub pending: usize,
}

/// Garbage collector for cleaning up orphaned extents.
///
/// Deletes never free extents directly because snapshots share them with the
/// base blob. An extent is reclaimed once it has been unreferenced for two
/// consecutive passes, which leaves writes that have stored data but not yet
/// published metadata alone.
pub struct GarbageCollector {
    metadata: Arc<dyn MetadataStore>,
    extents: Arc<dyn ExtentStore>,
    candidates: Mutex<HashSet<String>>,
}

impl GarbageCollector {
    pub fn new(metadata: Arc<dyn MetadataStore>, extents: Arc<dyn ExtentStore>) -> Self {
        Self {
            metadata,
            extents,
            candidates: Mutex::new(HashSet::new()),
        }
    }

    /// Performs a single garbage collection pass.
    pub async fn collect(&self) -> GcReport {
        debug!("Starting garbage collection");

        let stored = self.extents.extent_ids().await;
        let referenced = self.metadata.referenced_extents().await;
        let unreferenced: HashSet<String> = stored
            .iter()
            .filter(|id| !referenced.contains(id.as_str()))
            .cloned()
            .collect();

        let reclaimable: Vec<String> = {
            let mut candidates = self.candidates.lock();
            let reclaimable = unreferenced
                .iter()
                .filter(|id| candidates.contains(id.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            *candidates = unreferenced
                .iter()
                .filter(|id| !reclaimable.contains(*id))
                .cloned()
                .collect();
            reclaimable
        };

        let mut reclaimed = 0;
        for id in &reclaimable {
            if self.extents.delete(id).await.is_ok() {
                reclaimed += 1;
            }
        }

        let report = GcReport {
            scanned: stored.len(),
            reclaimed,
            pending: unreferenced.len() - reclaimable.len(),
        };
        if report.reclaimed > 0 {
            info!(
                reclaimed = report.reclaimed,
                scanned = report.scanned,
                "Reclaimed orphaned extents"
            );
        }
        report
    }
}
