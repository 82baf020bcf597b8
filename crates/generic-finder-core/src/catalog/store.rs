//! Swappable catalog snapshot.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use super::{fingerprint_records, Catalog, CatalogResult, RecordNormalizer};

/// Holds the current catalog and replaces it atomically on reload.
///
/// Readers clone the inner `Arc`, so a query that started against an old
/// snapshot finishes against it even if a reload lands mid-query.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Catalog> {
        // The guarded value is a plain Arc swap; a poisoned lock still holds a
        // complete snapshot.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new catalog, returning the previous one.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Rebuild from records unless they match the current snapshot's source.
    ///
    /// Returns `true` when a new catalog was swapped in.
    pub fn reload(&self, records: &Value, normalizer: &RecordNormalizer) -> CatalogResult<bool> {
        let fingerprint = fingerprint_records(records);
        if self.snapshot().fingerprint() == fingerprint {
            tracing::debug!("Catalog source unchanged, keeping snapshot");
            return Ok(false);
        }

        let catalog = Catalog::load_fingerprinted(records, normalizer, fingerprint)?;

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // Another reload may have installed the same source while we built ours
        if guard.fingerprint() == catalog.fingerprint() {
            tracing::debug!("Catalog source installed concurrently, keeping snapshot");
            return Ok(false);
        }
        *guard = Arc::new(catalog);
        Ok(true)
    }
}
